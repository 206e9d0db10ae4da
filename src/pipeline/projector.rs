//! The projector contract

use std::fmt;

use async_trait::async_trait;

use super::event::DataCollectedEvent;
use crate::storage::StorageError;

/// Why a projector could not apply an event
#[derive(Debug)]
pub enum ProjectionError {
    /// The payload does not have the shape the projector expects
    InvalidPayload(String),

    /// The projector was handed an event type it does not handle
    UnsupportedEvent(String),

    /// The entity store rejected the update
    Storage(StorageError),
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionError::InvalidPayload(msg) => write!(f, "invalid payload: {}", msg),
            ProjectionError::UnsupportedEvent(ty) => {
                write!(f, "unsupported event type: {}", ty)
            }
            ProjectionError::Storage(err) => write!(f, "storage failure: {}", err),
        }
    }
}

impl std::error::Error for ProjectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProjectionError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for ProjectionError {
    fn from(err: StorageError) -> Self {
        ProjectionError::Storage(err)
    }
}

impl From<serde_json::Error> for ProjectionError {
    fn from(err: serde_json::Error) -> Self {
        ProjectionError::InvalidPayload(err.to_string())
    }
}

/// Unit of work applying one event to the entities of a domain
///
/// ## Contract
///
/// - Safe to call concurrently for *different* events
/// - No assumption about the order in which events arrive
/// - Failures are returned, not panicked; the pool logs them and carries on
/// - No timeout is imposed: a projector that hangs blocks its worker
#[async_trait]
pub trait Projector: Send + Sync {
    /// Short name used in logs and failure reports
    fn name(&self) -> &'static str;

    async fn project(&self, event: &DataCollectedEvent) -> Result<(), ProjectionError>;
}
