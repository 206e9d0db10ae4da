//! Durable entities written by projectors
//!
//! This module provides a trait-based abstraction over the store projected
//! entities live in.
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database, see [`sqlite`]
//! - **In-Memory**: No persistence, for testing or database-less runs
//!
//! ## Usage
//!
//! ```no_run
//! use fact_hub::storage::{EntityStore, sqlite::SqliteEntityStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SqliteEntityStore::new("./facts.db").await?;
//!     let clusters = store.list_clusters().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{EntityStore, HealthStatus};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryEntityStore;
