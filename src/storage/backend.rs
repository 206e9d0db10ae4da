//! Entity store trait definition
//!
//! This module defines the `EntityStore` trait projectors write through and
//! the query side reads from.

use std::collections::HashMap;

use async_trait::async_trait;

use super::error::StorageResult;
use super::schema::{
    Cluster, Host, HostSizing, HostTelemetry, SapSystemInstance, SlesSubscription,
};

/// Health status of the entity store
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the store operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for durable entity storage
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`: one store is shared by all
/// projection workers, which call it concurrently for different events.
/// Concurrency control (transactions, locks) is the implementation's job.
///
/// ## Replacement semantics
///
/// SAP instances and subscriptions are reported as a complete list per
/// agent, so they are replaced per agent instead of upserted one by one.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert or update a cluster by id
    async fn upsert_cluster(&self, cluster: Cluster) -> StorageResult<()>;

    async fn get_cluster(&self, id: &str) -> StorageResult<Option<Cluster>>;

    /// All clusters, ordered by id
    async fn list_clusters(&self) -> StorageResult<Vec<Cluster>>;

    /// Insert or update a host by agent id
    async fn upsert_host(&self, host: Host) -> StorageResult<()>;

    async fn get_host(&self, agent_id: &str) -> StorageResult<Option<Host>>;

    /// All hosts, ordered by agent id
    async fn list_hosts(&self) -> StorageResult<Vec<Host>>;

    /// Replace every SAP instance reported by `agent_id`
    async fn replace_sap_system_instances(
        &self,
        agent_id: &str,
        instances: Vec<SapSystemInstance>,
    ) -> StorageResult<()>;

    /// All SAP instances, ordered by (sid, agent id, instance number)
    async fn list_sap_system_instances(&self) -> StorageResult<Vec<SapSystemInstance>>;

    /// Replace every subscription reported by `agent_id`
    async fn replace_subscriptions(
        &self,
        agent_id: &str,
        subscriptions: Vec<SlesSubscription>,
    ) -> StorageResult<()>;

    /// Subscriptions of one agent, ordered by identifier
    async fn list_subscriptions(&self, agent_id: &str) -> StorageResult<Vec<SlesSubscription>>;

    /// Set the hardware columns of a host's telemetry, creating the record if
    /// needed. The cloud provider is left untouched.
    async fn update_host_sizing(&self, agent_id: &str, sizing: HostSizing) -> StorageResult<()>;

    /// Set the cloud provider of a host's telemetry, creating the record if
    /// needed. The hardware columns are left untouched.
    async fn update_cloud_provider(
        &self,
        agent_id: &str,
        provider: Option<String>,
    ) -> StorageResult<()>;

    async fn get_host_telemetry(&self, agent_id: &str) -> StorageResult<Option<HostTelemetry>>;

    /// Check backend health
    async fn health_check(&self) -> StorageResult<HealthStatus>;
}
