use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{decode_payload, expect_type};
use crate::pipeline::{DataCollectedEvent, ProjectionError, Projector, discovery};
use crate::storage::EntityStore;
use crate::storage::schema::{SapSystemInstance, SapSystemType};

#[derive(Debug, Deserialize)]
struct SapSystemPayload {
    sid: String,
    #[serde(rename = "type")]
    system_type: SapSystemType,
    #[serde(default)]
    instances: Vec<InstancePayload>,
}

#[derive(Debug, Deserialize)]
struct InstancePayload {
    instance_number: String,
    #[serde(default)]
    features: String,
    hostname: Option<String>,
}

/// Replaces the SAP instances of the reporting agent
///
/// Each report carries every system found on the host, so systems missing
/// from a report are gone from the host.
pub struct SapSystemProjector {
    store: Arc<dyn EntityStore>,
}

impl SapSystemProjector {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Projector for SapSystemProjector {
    fn name(&self) -> &'static str {
        "sap_system"
    }

    #[instrument(skip_all, fields(event_id = event.id, agent_id = %event.agent_id))]
    async fn project(&self, event: &DataCollectedEvent) -> Result<(), ProjectionError> {
        expect_type(event, discovery::SAP_SYSTEM)?;
        let systems: Vec<SapSystemPayload> = decode_payload(event)?;

        let now = Utc::now();
        let mut instances = Vec::new();

        for system in systems {
            if system.sid.is_empty() {
                return Err(ProjectionError::InvalidPayload("SAP system without sid".into()));
            }

            for instance in system.instances {
                instances.push(SapSystemInstance {
                    agent_id: event.agent_id.clone(),
                    sid: system.sid.clone(),
                    system_type: system.system_type,
                    instance_number: instance.instance_number,
                    features: instance.features,
                    hostname: instance.hostname,
                    updated_at: now,
                });
            }
        }

        debug!("projecting {} SAP instances", instances.len());

        self.store
            .replace_sap_system_instances(&event.agent_id, instances)
            .await?;

        Ok(())
    }
}
