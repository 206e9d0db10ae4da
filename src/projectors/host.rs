use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{decode_payload, expect_type};
use crate::pipeline::{DataCollectedEvent, ProjectionError, Projector, discovery};
use crate::storage::EntityStore;
use crate::storage::schema::Host;

/// The part of a host report this projector cares about
///
/// Sizing fields of the same report are handled by the telemetry projector.
#[derive(Debug, Deserialize)]
struct HostPayload {
    hostname: String,
    #[serde(default)]
    ip_addresses: Vec<String>,
    #[serde(default)]
    agent_version: String,
}

/// Keeps one [`Host`] per reporting agent
pub struct HostProjector {
    store: Arc<dyn EntityStore>,
}

impl HostProjector {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Projector for HostProjector {
    fn name(&self) -> &'static str {
        "host"
    }

    #[instrument(skip_all, fields(event_id = event.id, agent_id = %event.agent_id))]
    async fn project(&self, event: &DataCollectedEvent) -> Result<(), ProjectionError> {
        expect_type(event, discovery::HOST)?;
        let HostPayload {
            hostname,
            mut ip_addresses,
            agent_version,
        } = decode_payload(event)?;

        ip_addresses.retain(|ip| !ip.is_empty());
        ip_addresses.dedup();

        debug!("projecting host {hostname} with {} addresses", ip_addresses.len());

        self.store
            .upsert_host(Host {
                agent_id: event.agent_id.clone(),
                hostname,
                ip_addresses,
                agent_version,
                updated_at: Utc::now(),
            })
            .await?;

        Ok(())
    }
}
