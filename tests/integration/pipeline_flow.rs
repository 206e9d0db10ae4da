//! End-to-end tests: collector → worker pool → projectors → entity store
//!
//! These tests verify that:
//! - Every production event type reaches its projectors
//! - Host reports feed both the host and the telemetry projector
//! - Unknown event types are accepted and ignored
//! - Concurrent submitters all get their events projected

use std::sync::Arc;

use fact_hub::pipeline::discovery;
use fact_hub::projectors::default_registry;
use fact_hub::storage::schema::ClusterType;
use fact_hub::storage::{EntityStore, MemoryEntityStore};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::helpers::{cluster_payload, host_payload, report, sap_payload, start_pipeline};

#[tokio::test]
async fn test_every_domain_is_projected() {
    let store = Arc::new(MemoryEntityStore::new());
    let pipeline = start_pipeline(default_registry(store.clone()), 4, 8);

    let reports = vec![
        report("agent-1", discovery::HOST, host_payload("vmhana01")),
        report("agent-1", discovery::CLUSTER, cluster_payload("c1", 2)),
        report("agent-1", discovery::CLOUD, json!({"provider": "azure"})),
        report("agent-1", discovery::SAP_SYSTEM, sap_payload("PRD")),
        report(
            "agent-1",
            discovery::SUBSCRIPTION,
            json!([{"identifier": "SLES_SAP", "version": "15.4", "arch": "x86_64", "status": "Registered"}]),
        ),
    ];

    for data in reports {
        pipeline.collector.store_events_for_projection(data).await.unwrap();
    }

    let stats = pipeline.finish().await.snapshot();
    assert_eq!(stats.events_processed, 5);
    assert_eq!(stats.unmatched_events, 0);
    assert_eq!(stats.projections_succeeded, 6);
    assert_eq!(stats.projections_failed, 0);

    let host = store.get_host("agent-1").await.unwrap().unwrap();
    assert_eq!(host.hostname, "vmhana01");

    let cluster = store.get_cluster("c1").await.unwrap().unwrap();
    assert_eq!(cluster.cluster_type, ClusterType::HanaScaleUp);

    let telemetry = store.get_host_telemetry("agent-1").await.unwrap().unwrap();
    assert_eq!(telemetry.cpu_count, Some(8));
    assert_eq!(telemetry.cloud_provider.as_deref(), Some("azure"));

    let instances = store.list_sap_system_instances().await.unwrap();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].sid, "PRD");

    let subscriptions = store.list_subscriptions("agent-1").await.unwrap();
    assert_eq!(subscriptions.len(), 1);
}

#[tokio::test]
async fn test_unknown_event_type_is_accepted_and_ignored() {
    let store = Arc::new(MemoryEntityStore::new());
    let pipeline = start_pipeline(default_registry(store.clone()), 2, 4);

    let id = pipeline
        .collector
        .store_events_for_projection(report("agent-1", "ha-checks-collected", json!({"x": 1})))
        .await
        .unwrap();
    assert_eq!(id, 1);

    let stats = pipeline.finish().await.snapshot();
    assert_eq!(stats.events_processed, 1);
    assert_eq!(stats.unmatched_events, 1);
    assert_eq!(stats.projections_succeeded + stats.projections_failed, 0);
    assert!(store.list_hosts().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submitters() {
    let store = Arc::new(MemoryEntityStore::new());
    let pipeline = start_pipeline(default_registry(store.clone()), 4, 2);
    let collector = Arc::new(pipeline.collector);

    let mut handles = Vec::new();
    for agent in 0..10 {
        let collector = collector.clone();
        handles.push(tokio::spawn(async move {
            let agent_id = format!("agent-{agent}");
            collector
                .store_events_for_projection(report(
                    &agent_id,
                    discovery::HOST,
                    host_payload(&format!("host{agent}")),
                ))
                .await
                .unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    assert_eq!(ids, (1..=10).collect::<Vec<u64>>());

    drop(collector);
    pipeline.handle.await.unwrap();

    let stats = pipeline.stats.snapshot();
    assert_eq!(stats.events_processed, 10);
    assert_eq!(stats.projections_succeeded, 20);

    let hosts = store.list_hosts().await.unwrap();
    assert_eq!(hosts.len(), 10);
    assert_eq!(hosts[0].agent_id, "agent-0");
}

#[tokio::test]
async fn test_latest_report_wins_for_same_agent() {
    let store = Arc::new(MemoryEntityStore::new());
    let pipeline = start_pipeline(default_registry(store.clone()), 1, 4);

    for sid in ["PRD", "QAS"] {
        pipeline
            .collector
            .store_events_for_projection(report("agent-1", discovery::SAP_SYSTEM, sap_payload(sid)))
            .await
            .unwrap();
    }
    pipeline.finish().await;

    let sids: Vec<String> = store
        .list_sap_system_instances()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.sid)
        .collect();
    assert_eq!(sids, vec!["QAS".to_string()]);
}
