//! Key/value backend trait definition

use async_trait::async_trait;

use super::error::FactResult;

/// A single raw entry of the key/value store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: String,
    pub value: Vec<u8>,
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Path-addressed key/value store the agents publish into
///
/// Paths use `/` as hierarchy separator. The backend is an external
/// service; implementations only translate calls and errors.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`, a single backend is shared by
/// every HTTP handler and projector.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// All entries whose key starts with `prefix`, ordered by key
    ///
    /// An unknown prefix yields an empty list, not an error.
    async fn list(&self, prefix: &str) -> FactResult<Vec<KvPair>>;

    /// A single entry
    async fn get(&self, key: &str) -> FactResult<Option<KvPair>>;

    /// Keys starting with `prefix`
    ///
    /// With a separator, keys are rolled up at the first separator after the
    /// prefix (the key of a "folder" ends with the separator).
    async fn keys(&self, prefix: &str, separator: Option<char>) -> FactResult<Vec<String>>;

    /// Store one entry, replacing any previous value
    async fn put(&self, pair: KvPair) -> FactResult<()>;

    /// Remove a single entry; a missing key is not an error
    async fn delete(&self, key: &str) -> FactResult<()>;

    /// Remove every entry whose key starts with `prefix`
    async fn delete_tree(&self, prefix: &str) -> FactResult<()>;
}
