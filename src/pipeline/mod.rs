//! Asynchronous projection of collected data
//!
//! Agents report discoveries as [`DataCollectedEvent`]s. The collector puts
//! them on the channel of a [`ProjectorsWorkerPool`]; its workers look the
//! event type up in the [`ProjectorRegistry`] and hand the event to every
//! [`Projector`] registered for it.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use fact_hub::config::PipelineConfig;
//! use fact_hub::pipeline::{CancellationToken, ProjectorRegistry, ProjectorsWorkerPool};
//!
//! # async fn example(registry: ProjectorRegistry) {
//! let cancel = CancellationToken::new();
//! let pool = ProjectorsWorkerPool::new(Arc::new(registry), &PipelineConfig::default(), cancel.clone());
//! let sender = pool.sender();
//!
//! let running = tokio::spawn(pool.run());
//! // `cancel.cancel()` stops the workers and makes `sender` reject events
//! // hand `sender` to the collector ...
//! drop(sender);
//! running.await.ok();
//! # }
//! ```

pub mod event;
pub mod pool;
pub mod projector;
pub mod registry;

pub use event::{DataCollectedEvent, discovery};
pub use pool::{
    EventSender, PoolStats, PoolStatsHandle, ProjectionFailure, ProjectionReport,
    ProjectorsWorkerPool, SubmitError, project_event,
};
pub use projector::{ProjectionError, Projector};
pub use registry::{ProjectorRegistry, RegistryBuilder};
pub use tokio_util::sync::CancellationToken;
