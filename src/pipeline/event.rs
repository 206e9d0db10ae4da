//! Events flowing through the projection pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event types emitted by the agents' discoveries
pub mod discovery {
    pub const CLUSTER: &str = "cluster-collected";
    pub const HOST: &str = "host-collected";
    pub const CLOUD: &str = "cloud-collected";
    pub const SAP_SYSTEM: &str = "sap-system-collected";
    pub const SUBSCRIPTION: &str = "subscription-collected";
}

/// One batch of facts collected by an agent
///
/// Created by the collector when a report is accepted and consumed exactly
/// once by the worker pool. It is not kept after projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCollectedEvent {
    /// Arrival sequence number, monotonic per collector
    pub id: u64,

    /// Agent that collected the facts
    pub agent_id: String,

    /// Type discriminator used to look up projectors
    pub discovery_type: String,

    /// The collected facts, opaque to the pipeline
    pub payload: serde_json::Value,

    /// When the collector accepted the report
    pub received_at: DateTime<Utc>,
}

impl DataCollectedEvent {
    pub fn new(
        id: u64,
        agent_id: impl Into<String>,
        discovery_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id,
            agent_id: agent_id.into(),
            discovery_type: discovery_type.into(),
            payload,
            received_at: Utc::now(),
        }
    }
}
