use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{decode_payload, expect_type};
use crate::pipeline::{DataCollectedEvent, ProjectionError, Projector, discovery};
use crate::storage::EntityStore;
use crate::storage::schema::SlesSubscription;

#[derive(Debug, Deserialize)]
struct SubscriptionPayload {
    identifier: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    arch: String,
    #[serde(default)]
    status: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Replaces the SLES subscriptions of the reporting agent
pub struct SubscriptionProjector {
    store: Arc<dyn EntityStore>,
}

impl SubscriptionProjector {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Projector for SubscriptionProjector {
    fn name(&self) -> &'static str {
        "subscription"
    }

    #[instrument(skip_all, fields(event_id = event.id, agent_id = %event.agent_id))]
    async fn project(&self, event: &DataCollectedEvent) -> Result<(), ProjectionError> {
        expect_type(event, discovery::SUBSCRIPTION)?;
        let payload: Vec<SubscriptionPayload> = decode_payload(event)?;

        let now = Utc::now();
        let subscriptions: Vec<SlesSubscription> = payload
            .into_iter()
            .map(|s| SlesSubscription {
                agent_id: event.agent_id.clone(),
                identifier: s.identifier,
                version: s.version,
                arch: s.arch,
                status: s.status,
                expires_at: s.expires_at,
                updated_at: now,
            })
            .collect();

        debug!("projecting {} subscriptions", subscriptions.len());

        self.store
            .replace_subscriptions(&event.agent_id, subscriptions)
            .await?;

        Ok(())
    }
}
