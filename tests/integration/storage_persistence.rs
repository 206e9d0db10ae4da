//! Integration tests for entity persistence
//!
//! These tests verify that:
//! - Projections through the pipeline land in SQLite
//! - Entities survive reopening the database
//! - Per-agent replacement holds across reopen

use std::sync::Arc;

use fact_hub::pipeline::discovery;
use fact_hub::projectors::default_registry;
use fact_hub::storage::EntityStore;
use fact_hub::storage::sqlite::SqliteEntityStore;
use serde_json::json;
use tempfile::tempdir;

use super::helpers::{cluster_payload, host_payload, report, sap_payload, start_pipeline};

#[tokio::test]
async fn test_projected_entities_survive_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("facts.db");

    {
        let store: Arc<dyn EntityStore> = Arc::new(SqliteEntityStore::new(&db_path).await.unwrap());
        let pipeline = start_pipeline(default_registry(store), 2, 4);

        for data in [
            report("agent-1", discovery::HOST, host_payload("vmhana01")),
            report("agent-1", discovery::CLUSTER, cluster_payload("c1", 2)),
            report("agent-1", discovery::SAP_SYSTEM, sap_payload("PRD")),
            report("agent-1", discovery::CLOUD, json!({"provider": "gcp"})),
        ] {
            pipeline.collector.store_events_for_projection(data).await.unwrap();
        }

        let stats = pipeline.finish().await.snapshot();
        assert_eq!(stats.projections_failed, 0);
    }

    let reopened = SqliteEntityStore::new(&db_path).await.unwrap();

    let host = reopened.get_host("agent-1").await.unwrap().unwrap();
    assert_eq!(host.hostname, "vmhana01");
    assert_eq!(host.ip_addresses, vec!["10.0.0.4"]);

    let cluster = reopened.get_cluster("c1").await.unwrap().unwrap();
    assert_eq!(cluster.hosts_number, 2);

    let telemetry = reopened.get_host_telemetry("agent-1").await.unwrap().unwrap();
    assert_eq!(telemetry.cloud_provider.as_deref(), Some("gcp"));
    assert_eq!(telemetry.socket_count, Some(2));

    let instances = reopened.list_sap_system_instances().await.unwrap();
    assert_eq!(instances.len(), 1);
}

#[tokio::test]
async fn test_sap_instances_replaced_per_agent() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("facts.db");
    let store = Arc::new(SqliteEntityStore::new(&db_path).await.unwrap());

    let pipeline = start_pipeline(default_registry(store.clone()), 1, 4);
    for (agent, sid) in [("agent-1", "PRD"), ("agent-2", "PRD"), ("agent-1", "QAS")] {
        pipeline
            .collector
            .store_events_for_projection(report(agent, discovery::SAP_SYSTEM, sap_payload(sid)))
            .await
            .unwrap();
    }
    pipeline.finish().await;

    let listed: Vec<(String, String)> = store
        .list_sap_system_instances()
        .await
        .unwrap()
        .into_iter()
        .map(|i| (i.sid, i.agent_id))
        .collect();

    assert_eq!(
        listed,
        vec![
            ("PRD".to_string(), "agent-2".to_string()),
            ("QAS".to_string(), "agent-1".to_string()),
        ]
    );
}
