use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::decode_payload;
use crate::pipeline::{DataCollectedEvent, ProjectionError, Projector, discovery};
use crate::storage::EntityStore;
use crate::storage::schema::HostSizing;

#[derive(Debug, Deserialize)]
struct HostPayload {
    hostname: Option<String>,
    cpu_count: Option<u32>,
    socket_count: Option<u32>,
    total_memory_mb: Option<u64>,
    os_version: Option<String>,
}

impl From<HostPayload> for HostSizing {
    fn from(payload: HostPayload) -> Self {
        Self {
            hostname: payload.hostname,
            cpu_count: payload.cpu_count,
            socket_count: payload.socket_count,
            total_memory_mb: payload.total_memory_mb,
            sles_version: payload.os_version,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CloudPayload {
    provider: Option<String>,
}

/// Builds the [`HostTelemetry`](crate::storage::schema::HostTelemetry) record
/// of an agent from two event types
///
/// Host reports set the sizing columns and cloud reports set the provider.
/// Each writes only its own columns, so the two may run at the same time.
pub struct TelemetryProjector {
    store: Arc<dyn EntityStore>,
}

impl TelemetryProjector {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Projector for TelemetryProjector {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    #[instrument(skip_all, fields(event_id = event.id, agent_id = %event.agent_id))]
    async fn project(&self, event: &DataCollectedEvent) -> Result<(), ProjectionError> {
        match event.discovery_type.as_str() {
            discovery::HOST => {
                let payload: HostPayload = decode_payload(event)?;
                debug!("updating host sizing");
                self.store
                    .update_host_sizing(&event.agent_id, payload.into())
                    .await?;
            }
            discovery::CLOUD => {
                let cloud: CloudPayload = decode_payload(event)?;
                debug!("updating cloud provider");
                self.store
                    .update_cloud_provider(
                        &event.agent_id,
                        cloud.provider.filter(|p| !p.is_empty()),
                    )
                    .await?;
            }
            other => return Err(ProjectionError::UnsupportedEvent(other.to_string())),
        }

        Ok(())
    }
}
