//! Projectors for each monitored domain
//!
//! | event type               | projectors                              |
//! |--------------------------|-----------------------------------------|
//! | `cluster-collected`      | [`ClusterProjector`]                    |
//! | `host-collected`         | [`HostProjector`], [`TelemetryProjector`] |
//! | `cloud-collected`        | [`TelemetryProjector`]                  |
//! | `sap-system-collected`   | [`SapSystemProjector`]                  |
//! | `subscription-collected` | [`SubscriptionProjector`]               |

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::pipeline::{DataCollectedEvent, ProjectionError, Projector, ProjectorRegistry, discovery};
use crate::storage::EntityStore;

pub mod cluster;
pub mod host;
pub mod sap_system;
pub mod subscription;
pub mod telemetry;

pub use cluster::ClusterProjector;
pub use host::HostProjector;
pub use sap_system::SapSystemProjector;
pub use subscription::SubscriptionProjector;
pub use telemetry::TelemetryProjector;

/// Registry with every production projector, all writing to `store`
pub fn default_registry(store: Arc<dyn EntityStore>) -> ProjectorRegistry {
    let telemetry: Arc<dyn Projector> = Arc::new(TelemetryProjector::new(store.clone()));

    ProjectorRegistry::builder()
        .register(discovery::CLUSTER, Arc::new(ClusterProjector::new(store.clone())))
        .register(discovery::HOST, Arc::new(HostProjector::new(store.clone())))
        .register(discovery::HOST, telemetry.clone())
        .register(discovery::CLOUD, telemetry)
        .register(discovery::SAP_SYSTEM, Arc::new(SapSystemProjector::new(store.clone())))
        .register(discovery::SUBSCRIPTION, Arc::new(SubscriptionProjector::new(store)))
        .build()
}

/// Deserialize the payload of `event` into the shape a projector expects
pub(crate) fn decode_payload<T: DeserializeOwned>(
    event: &DataCollectedEvent,
) -> Result<T, ProjectionError> {
    T::deserialize(&event.payload).map_err(|e| {
        ProjectionError::InvalidPayload(format!("{} payload: {e}", event.discovery_type))
    })
}

/// Reject events the projector was not written for
pub(crate) fn expect_type(event: &DataCollectedEvent, expected: &str) -> Result<(), ProjectionError> {
    if event.discovery_type == expected {
        Ok(())
    } else {
        Err(ProjectionError::UnsupportedEvent(event.discovery_type.clone()))
    }
}
