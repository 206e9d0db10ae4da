//! Helper functions for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use fact_hub::{
    collector::{CollectedData, CollectorService},
    config::PipelineConfig,
    pipeline::{CancellationToken, PoolStatsHandle, ProjectorRegistry, ProjectorsWorkerPool},
};
use serde_json::json;
use tokio::task::JoinHandle;

/// A running pool with a collector in front of it
pub struct RunningPipeline {
    pub collector: CollectorService,
    pub stats: PoolStatsHandle,
    pub cancel: CancellationToken,
    pub handle: JoinHandle<()>,
}

impl RunningPipeline {
    /// Close the channel and wait for the workers to drain it
    pub async fn finish(self) -> PoolStatsHandle {
        drop(self.collector);
        self.handle.await.unwrap();
        self.stats
    }
}

pub fn start_pipeline(registry: ProjectorRegistry, workers: usize, capacity: usize) -> RunningPipeline {
    let config = PipelineConfig {
        workers,
        channel_capacity: capacity,
    };
    let cancel = CancellationToken::new();
    let pool = ProjectorsWorkerPool::new(Arc::new(registry), &config, cancel.clone());
    let stats = pool.stats();
    let collector = CollectorService::new(pool.sender());
    let handle = tokio::spawn(pool.run());

    RunningPipeline {
        collector,
        stats,
        cancel,
        handle,
    }
}

pub fn report(agent_id: &str, discovery_type: &str, payload: serde_json::Value) -> CollectedData {
    CollectedData {
        agent_id: agent_id.to_string(),
        discovery_type: discovery_type.to_string(),
        payload,
    }
}

pub fn host_payload(hostname: &str) -> serde_json::Value {
    json!({
        "hostname": hostname,
        "ip_addresses": ["10.0.0.4"],
        "agent_version": "1.1.0",
        "cpu_count": 8,
        "socket_count": 2,
        "total_memory_mb": 65536,
        "os_version": "15-SP4"
    })
}

pub fn cluster_payload(id: &str, hosts_number: u32) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("cluster-{id}"),
        "cluster_type": "hana_scale_up",
        "sid": "PRD",
        "resources_number": 6,
        "hosts_number": hosts_number
    })
}

pub fn sap_payload(sid: &str) -> serde_json::Value {
    json!([{
        "sid": sid,
        "type": "database",
        "instances": [{"instance_number": "00", "features": "HDB|HDB_WORKER"}]
    }])
}
