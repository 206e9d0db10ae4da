//! Agent-published facts in the key/value store
//!
//! Agents periodically publish nested configuration and state trees into a
//! path-addressed key/value store (Consul). This module maps between the flat
//! entries of that store and nested [`Tree`]s.
//!
//! ## Layers
//!
//! - [`tree`]: pure flatten/unflatten algorithm, no I/O
//! - [`backend`]: the `KvBackend` trait for the remote store
//! - [`consul`] / [`memory`]: backend implementations
//! - [`store`]: `FactStore`, the client handlers use to read and write trees
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use fact_hub::config::ConsulConfig;
//! use fact_hub::facts::{FactStore, consul::ConsulBackend, paths::CLUSTERS_PATH};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let backend = ConsulBackend::new(&ConsulConfig::default())?;
//! let store = FactStore::new(Arc::new(backend));
//! let clusters = store.read(CLUSTERS_PATH).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod consul;
pub mod error;
pub mod memory;
pub mod metadata;
pub mod paths;
pub mod store;
pub mod tree;

pub use backend::{KvBackend, KvPair};
pub use error::{FactResult, FactStoreError};
pub use store::FactStore;
pub use tree::{ToTree, Tree};
