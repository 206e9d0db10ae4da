//! CollectorService - entry point for agent reports
//!
//! ## Message Flow
//!
//! ```text
//! Agent report (CollectedData) → validate → DataCollectedEvent → EventSender → worker pool
//! ```
//!
//! Accepting a report only means it reached the pipeline. Projection happens
//! later and its failures are not reported back to the agent.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::pipeline::{DataCollectedEvent, EventSender, SubmitError};

/// One report as sent by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedData {
    pub agent_id: String,
    pub discovery_type: String,
    pub payload: serde_json::Value,
}

/// Validates agent reports and feeds them into the projection pipeline
pub struct CollectorService {
    sender: EventSender,
    sequence: AtomicU64,
    accepted: AtomicU64,
}

impl CollectorService {
    pub fn new(sender: EventSender) -> Self {
        Self {
            sender,
            sequence: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
        }
    }

    /// Turn `data` into an event and submit it
    ///
    /// Returns the arrival sequence number assigned to the event. Waits while
    /// the pipeline is saturated.
    #[instrument(skip_all, fields(agent_id = %data.agent_id, discovery_type = %data.discovery_type))]
    pub async fn store_events_for_projection(&self, data: CollectedData) -> Result<u64, SubmitError> {
        validate(&data)?;

        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let event = DataCollectedEvent::new(id, data.agent_id, data.discovery_type, data.payload);

        match self.sender.submit(event).await {
            Ok(()) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
                debug!("accepted event {id}");
                Ok(id)
            }
            Err(e) => {
                warn!("rejected event {id}: {e}");
                Err(e)
            }
        }
    }

    /// Number of events that reached the pipeline
    ///
    /// Rejected submissions still consume a sequence number, so this can be
    /// lower than the last id handed out.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}

fn validate(data: &CollectedData) -> Result<(), SubmitError> {
    if data.agent_id.trim().is_empty() {
        return Err(SubmitError::InvalidEvent("agent id is empty".into()));
    }
    if data.discovery_type.trim().is_empty() {
        return Err(SubmitError::InvalidEvent("discovery type is empty".into()));
    }
    if data.payload.is_null() {
        return Err(SubmitError::InvalidEvent("payload is missing".into()));
    }
    Ok(())
}
