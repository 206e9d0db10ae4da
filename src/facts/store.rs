//! Fact store client
//!
//! Wraps a [`KvBackend`] and exposes the agent-published data as [`Tree`]s.
//!
//! ## Write semantics
//!
//! Trees are written one entry at a time. When a write fails halfway, the
//! entries written before the failure stay in the store: writes are
//! at-least-partial, never atomic, and nothing is rolled back.

use std::sync::Arc;

use tracing::{debug, instrument, trace};

use super::backend::{KvBackend, KvPair};
use super::error::{FactResult, FactStoreError};
use super::metadata::HostMetadata;
use super::paths::host_metadata_path;
use super::tree::{SEPARATOR, ToTree, Tree, encode_for_storage, flatten, unflatten};

#[derive(Clone)]
pub struct FactStore {
    backend: Arc<dyn KvBackend>,
}

impl FactStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Entries below `prefix` as a tree, with `offset` stripped from every path
    #[instrument(skip(self))]
    pub async fn list_map(&self, prefix: &str, offset: &str) -> FactResult<Tree> {
        let entries = self.backend.list(prefix).await?;
        trace!("unflattening {} entries", entries.len());

        Ok(unflatten(
            entries.into_iter().map(|pair| (pair.key, pair.value)),
            offset,
        ))
    }

    /// Everything stored below `prefix`, relative to `prefix`
    ///
    /// Fails with [`FactStoreError::NotFound`] when nothing is stored there.
    pub async fn read(&self, prefix: &str) -> FactResult<Tree> {
        let folder = folder(prefix);
        let tree = self.list_map(&folder, &folder).await?;

        if tree.is_empty() {
            return Err(FactStoreError::NotFound(prefix.to_string()));
        }

        Ok(tree)
    }

    /// Write every leaf of `tree` below `prefix`
    ///
    /// Returns the number of entries written.
    pub async fn write(&self, prefix: &str, tree: &Tree) -> FactResult<usize> {
        self.put_entries(flatten(prefix, tree)).await
    }

    /// Decompose `value` and write it below `prefix`
    pub async fn write_value<T>(&self, prefix: &str, value: &T) -> FactResult<usize>
    where
        T: ToTree + ?Sized + Sync,
    {
        self.put_entries(encode_for_storage(prefix, value)).await
    }

    /// Store a single string value
    pub async fn put_str(&self, key: &str, value: &str) -> FactResult<()> {
        if key.trim_matches(SEPARATOR).trim().is_empty() {
            return Err(FactStoreError::MalformedPath(key.to_string()));
        }

        self.backend.put(KvPair::new(key, value)).await?;
        trace!("value {value:?} stored at {key}");
        Ok(())
    }

    /// Remove everything below `prefix`, and the entry at `prefix` itself
    ///
    /// Only whole path segments match: deleting `hosts/h1` keeps `hosts/h10`.
    #[instrument(skip(self))]
    pub async fn delete(&self, prefix: &str) -> FactResult<()> {
        let key = prefix.trim_end_matches(SEPARATOR);
        if key.is_empty() {
            return Err(FactStoreError::MalformedPath(prefix.to_string()));
        }

        self.backend.delete_tree(&folder(key)).await?;
        self.backend.delete(key).await?;
        debug!("deleted {key}");
        Ok(())
    }

    /// Names of the immediate children of `prefix`
    pub async fn children(&self, prefix: &str) -> FactResult<Vec<String>> {
        let folder = folder(prefix);
        let keys = self.backend.keys(&folder, Some(SEPARATOR)).await?;

        Ok(keys
            .iter()
            .filter_map(|key| key.strip_prefix(folder.as_str()))
            .map(|child| child.trim_end_matches(SEPARATOR))
            .filter(|child| !child.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Replace the SAP grouping of a host
    pub async fn store_host_metadata(&self, host: &str, metadata: &HostMetadata) -> FactResult<()> {
        let path = host_metadata_path(host);
        self.delete(&path).await?;
        self.write_value(&path, metadata).await?;
        Ok(())
    }

    /// SAP grouping of a host, empty when none was published
    pub async fn load_host_metadata(&self, host: &str) -> FactResult<HostMetadata> {
        let path = host_metadata_path(host);
        let tree = self.list_map(&path, &path).await?;
        Ok(HostMetadata::from_tree(&tree))
    }

    async fn put_entries(&self, entries: Vec<(String, String)>) -> FactResult<usize> {
        let total = entries.len();

        for (written, (key, value)) in entries.into_iter().enumerate() {
            if let Err(e) = self.put_str(&key, &value).await {
                debug!("write failed after {written} of {total} entries, keeping them");
                return Err(e);
            }
        }

        Ok(total)
    }
}

fn folder(prefix: &str) -> String {
    format!("{}{SEPARATOR}", prefix.trim_end_matches(SEPARATOR))
}
