use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{decode_payload, expect_type};
use crate::pipeline::{DataCollectedEvent, ProjectionError, Projector, discovery};
use crate::storage::EntityStore;
use crate::storage::schema::{Cluster, ClusterType};

#[derive(Debug, Deserialize)]
struct ClusterPayload {
    id: String,
    name: String,
    #[serde(default)]
    cluster_type: ClusterType,
    sid: Option<String>,
    #[serde(default)]
    resources_number: u32,
    #[serde(default)]
    hosts_number: u32,
}

/// Keeps one [`Cluster`] per reported cluster id
pub struct ClusterProjector {
    store: Arc<dyn EntityStore>,
}

impl ClusterProjector {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Projector for ClusterProjector {
    fn name(&self) -> &'static str {
        "cluster"
    }

    #[instrument(skip_all, fields(event_id = event.id, agent_id = %event.agent_id))]
    async fn project(&self, event: &DataCollectedEvent) -> Result<(), ProjectionError> {
        expect_type(event, discovery::CLUSTER)?;
        let payload: ClusterPayload = decode_payload(event)?;

        if payload.id.trim().is_empty() {
            return Err(ProjectionError::InvalidPayload("cluster id is empty".into()));
        }

        debug!("projecting cluster {} ({})", payload.name, payload.cluster_type);

        self.store
            .upsert_cluster(Cluster {
                id: payload.id,
                name: payload.name,
                cluster_type: payload.cluster_type,
                sid: payload.sid.filter(|sid| !sid.is_empty()),
                resources_number: payload.resources_number,
                hosts_number: payload.hosts_number,
                updated_at: Utc::now(),
            })
            .await?;

        Ok(())
    }
}
