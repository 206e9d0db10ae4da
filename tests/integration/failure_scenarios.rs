//! Failure handling across the pipeline
//!
//! These tests verify that:
//! - A malformed report fails only the projectors that cannot read it
//! - Failed projections do not stop later events
//! - Reports submitted after shutdown are rejected

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use fact_hub::pipeline::{SubmitError, discovery};
use fact_hub::projectors::default_registry;
use fact_hub::storage::{EntityStore, MemoryEntityStore};
use serde_json::json;

use super::helpers::{host_payload, report, start_pipeline};

#[tokio::test]
async fn test_malformed_host_report_is_partially_projected() {
    let store = Arc::new(MemoryEntityStore::new());
    let pipeline = start_pipeline(default_registry(store.clone()), 2, 4);

    // No hostname: the host projector fails, telemetry still records sizing
    pipeline
        .collector
        .store_events_for_projection(report("agent-1", discovery::HOST, json!({"cpu_count": 4})))
        .await
        .unwrap();

    let stats = pipeline.finish().await.snapshot();
    assert_eq!(stats.projections_failed, 1);
    assert_eq!(stats.projections_succeeded, 1);

    assert!(store.get_host("agent-1").await.unwrap().is_none());
    let telemetry = store.get_host_telemetry("agent-1").await.unwrap().unwrap();
    assert_eq!(telemetry.cpu_count, Some(4));
}

#[tokio::test]
async fn test_failures_do_not_stop_later_events() {
    let store = Arc::new(MemoryEntityStore::new());
    let pipeline = start_pipeline(default_registry(store.clone()), 1, 2);

    for i in 0..6 {
        let data = if i == 2 {
            report("agent-x", discovery::CLUSTER, json!("not a cluster"))
        } else {
            report(&format!("agent-{i}"), discovery::HOST, host_payload(&format!("h{i}")))
        };
        pipeline.collector.store_events_for_projection(data).await.unwrap();
    }

    let stats = pipeline.finish().await.snapshot();
    assert_eq!(stats.events_processed, 6);
    assert_eq!(stats.projections_failed, 1);
    assert_eq!(stats.projections_succeeded, 10);
    assert_eq!(store.list_hosts().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_reports_after_shutdown_are_rejected() {
    let store = Arc::new(MemoryEntityStore::new());
    let pipeline = start_pipeline(default_registry(store), 2, 4);

    pipeline.cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), pipeline.handle)
        .await
        .expect("pool should stop on cancellation")
        .unwrap();

    assert_matches!(
        pipeline
            .collector
            .store_events_for_projection(report("agent-1", discovery::HOST, host_payload("h1")))
            .await,
        Err(SubmitError::ChannelClosed)
    );
}

#[tokio::test]
async fn test_invalid_reports_never_reach_the_pool() {
    let store = Arc::new(MemoryEntityStore::new());
    let pipeline = start_pipeline(default_registry(store), 1, 1);

    assert_matches!(
        pipeline
            .collector
            .store_events_for_projection(report("", discovery::HOST, host_payload("h1")))
            .await,
        Err(SubmitError::InvalidEvent(_))
    );

    let stats = pipeline.finish().await.snapshot();
    assert_eq!(stats.events_processed, 0);
}
