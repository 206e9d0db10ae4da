//! In-memory entity store (no persistence)
//!
//! This store keeps entities in ordered maps behind a `RwLock`.
//! It's useful for:
//! - Testing without database dependencies
//! - Running the hub without a database (`"storage": {"backend": "none"}`)
//!
//! ## Limitations
//!
//! - **No persistence**: All data lost on restart

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{EntityStore, HealthStatus};
use super::error::StorageResult;
use super::schema::{
    Cluster, Host, HostSizing, HostTelemetry, SapSystemInstance, SlesSubscription,
};

#[derive(Default)]
struct Entities {
    clusters: BTreeMap<String, Cluster>,
    hosts: BTreeMap<String, Host>,
    sap_system_instances: BTreeMap<String, Vec<SapSystemInstance>>,
    subscriptions: BTreeMap<String, Vec<SlesSubscription>>,
    telemetry: BTreeMap<String, HostTelemetry>,
}

/// In-memory entity store
#[derive(Default)]
pub struct MemoryEntityStore {
    entities: RwLock<Entities>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn upsert_cluster(&self, cluster: Cluster) -> StorageResult<()> {
        debug!("storing cluster {}", cluster.id);
        self.entities
            .write()
            .await
            .clusters
            .insert(cluster.id.clone(), cluster);
        Ok(())
    }

    async fn get_cluster(&self, id: &str) -> StorageResult<Option<Cluster>> {
        Ok(self.entities.read().await.clusters.get(id).cloned())
    }

    async fn list_clusters(&self) -> StorageResult<Vec<Cluster>> {
        Ok(self.entities.read().await.clusters.values().cloned().collect())
    }

    async fn upsert_host(&self, host: Host) -> StorageResult<()> {
        debug!("storing host {}", host.agent_id);
        self.entities
            .write()
            .await
            .hosts
            .insert(host.agent_id.clone(), host);
        Ok(())
    }

    async fn get_host(&self, agent_id: &str) -> StorageResult<Option<Host>> {
        Ok(self.entities.read().await.hosts.get(agent_id).cloned())
    }

    async fn list_hosts(&self) -> StorageResult<Vec<Host>> {
        Ok(self.entities.read().await.hosts.values().cloned().collect())
    }

    async fn replace_sap_system_instances(
        &self,
        agent_id: &str,
        instances: Vec<SapSystemInstance>,
    ) -> StorageResult<()> {
        debug!("replacing {} SAP instances of {agent_id}", instances.len());
        self.entities
            .write()
            .await
            .sap_system_instances
            .insert(agent_id.to_string(), instances);
        Ok(())
    }

    async fn list_sap_system_instances(&self) -> StorageResult<Vec<SapSystemInstance>> {
        let entities = self.entities.read().await;
        let mut instances: Vec<SapSystemInstance> = entities
            .sap_system_instances
            .values()
            .flatten()
            .cloned()
            .collect();

        instances.sort_by(|a, b| {
            (&a.sid, &a.agent_id, &a.instance_number).cmp(&(&b.sid, &b.agent_id, &b.instance_number))
        });

        Ok(instances)
    }

    async fn replace_subscriptions(
        &self,
        agent_id: &str,
        mut subscriptions: Vec<SlesSubscription>,
    ) -> StorageResult<()> {
        debug!("replacing {} subscriptions of {agent_id}", subscriptions.len());
        subscriptions.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        self.entities
            .write()
            .await
            .subscriptions
            .insert(agent_id.to_string(), subscriptions);
        Ok(())
    }

    async fn list_subscriptions(&self, agent_id: &str) -> StorageResult<Vec<SlesSubscription>> {
        Ok(self
            .entities
            .read()
            .await
            .subscriptions
            .get(agent_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_host_sizing(&self, agent_id: &str, sizing: HostSizing) -> StorageResult<()> {
        let mut entities = self.entities.write().await;
        let telemetry = entities
            .telemetry
            .entry(agent_id.to_string())
            .or_insert_with(|| HostTelemetry::empty(agent_id));

        telemetry.hostname = sizing.hostname;
        telemetry.cpu_count = sizing.cpu_count;
        telemetry.socket_count = sizing.socket_count;
        telemetry.total_memory_mb = sizing.total_memory_mb;
        telemetry.sles_version = sizing.sles_version;
        telemetry.updated_at = Utc::now();
        Ok(())
    }

    async fn update_cloud_provider(
        &self,
        agent_id: &str,
        provider: Option<String>,
    ) -> StorageResult<()> {
        let mut entities = self.entities.write().await;
        let telemetry = entities
            .telemetry
            .entry(agent_id.to_string())
            .or_insert_with(|| HostTelemetry::empty(agent_id));

        telemetry.cloud_provider = provider;
        telemetry.updated_at = Utc::now();
        Ok(())
    }

    async fn get_host_telemetry(&self, agent_id: &str) -> StorageResult<Option<HostTelemetry>> {
        Ok(self.entities.read().await.telemetry.get(agent_id).cloned())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let entities = self.entities.read().await;
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory entity store operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("clusters".to_string(), entities.clusters.len().to_string()),
                ("hosts".to_string(), entities.hosts.len().to_string()),
            ]),
        })
    }
}
