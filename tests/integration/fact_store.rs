//! Fact store against the in-memory and the Consul backend
//!
//! These tests verify that:
//! - Trees written below a prefix read back unchanged
//! - Consul responses are decoded into trees relative to the prefix
//! - Host metadata survives a store/load cycle

use std::sync::Arc;

use assert_matches::assert_matches;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fact_hub::config::ConsulConfig;
use fact_hub::facts::consul::ConsulBackend;
use fact_hub::facts::memory::MemoryKv;
use fact_hub::facts::metadata::HostMetadata;
use fact_hub::facts::paths::{CLUSTERS_PATH, HOSTS_PATH, host_metadata_path};
use fact_hub::facts::tree::{flatten, unflatten};
use fact_hub::facts::{FactStore, FactStoreError, KvBackend, Tree};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cluster_tree() -> Tree {
    Tree::branch().with(
        "cluster1",
        Tree::branch().with("name", "c1").with(
            "nodes",
            Tree::branch().with("h1", "up").with("h2", "down"),
        ),
    )
}

#[test]
fn test_cluster_tree_example() {
    let flat = flatten(CLUSTERS_PATH, &cluster_tree());

    assert_eq!(
        flat,
        vec![
            ("trento/v0/clusters/cluster1/name".to_string(), "c1".to_string()),
            ("trento/v0/clusters/cluster1/nodes/h1".to_string(), "up".to_string()),
            ("trento/v0/clusters/cluster1/nodes/h2".to_string(), "down".to_string()),
        ]
    );

    assert_eq!(unflatten(flat, CLUSTERS_PATH), cluster_tree());
}

#[tokio::test]
async fn test_write_then_read_in_memory() {
    let kv = Arc::new(MemoryKv::new());
    let store = FactStore::new(kv.clone());

    let written = store.write(CLUSTERS_PATH, &cluster_tree()).await.unwrap();
    assert_eq!(written, 3);
    assert_eq!(kv.len().await, 3);

    assert_eq!(store.read(CLUSTERS_PATH).await.unwrap(), cluster_tree());
    assert_eq!(store.read("trento/v0/clusters/").await.unwrap(), cluster_tree());
    assert_eq!(store.children(CLUSTERS_PATH).await.unwrap(), vec!["cluster1"]);

    store.delete(CLUSTERS_PATH).await.unwrap();
    assert_matches!(
        store.read(CLUSTERS_PATH).await,
        Err(FactStoreError::NotFound(_))
    );
}

#[tokio::test]
async fn test_structured_value_is_decomposed() {
    let store = FactStore::new(Arc::new(MemoryKv::new()));

    store
        .write_value(
            "trento/v0/hosts/h1/sapsystems",
            &json!({"PRD": {"type": 1, "profiles": ["DEFAULT", "HDB00"], "active": true}}),
        )
        .await
        .unwrap();

    let tree = store.read("trento/v0/hosts/h1/sapsystems").await.unwrap();
    assert_eq!(tree.get_str("PRD/type"), Some("1"));
    assert_eq!(tree.get_str("PRD/profiles/1"), Some("HDB00"));
    assert_eq!(tree.get_str("PRD/active"), Some("true"));
}

#[tokio::test]
async fn test_host_metadata_round_trip() {
    let kv = Arc::new(MemoryKv::new());
    let store = FactStore::new(kv.clone());

    let metadata = HostMetadata {
        sap_environment: Some("production".to_string()),
        sap_landscape: Some("emea".to_string()),
        sap_system: None,
    };
    store.store_host_metadata("h1", &metadata).await.unwrap();
    assert_eq!(store.load_host_metadata("h1").await.unwrap(), metadata);

    // Storing again replaces the previous grouping
    let regrouped = HostMetadata {
        sap_system: Some("PRD".to_string()),
        ..HostMetadata::default()
    };
    store.store_host_metadata("h1", &regrouped).await.unwrap();
    assert_eq!(store.load_host_metadata("h1").await.unwrap(), regrouped);
    assert_eq!(
        kv.keys(&host_metadata_path("h1"), None).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_read_from_consul() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/kv/trento/v0/hosts/"))
        .and(query_param("recurse", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "Key": "trento/v0/hosts/", "Value": null },
            { "Key": "trento/v0/hosts/h1/", "Value": null },
            { "Key": "trento/v0/hosts/h1/metadata/sap-environment", "Value": STANDARD.encode("qa") },
            { "Key": "trento/v0/hosts/h2/ip", "Value": STANDARD.encode("10.0.0.2") }
        ])))
        .mount(&mock_server)
        .await;

    let backend = ConsulBackend::new(&ConsulConfig {
        address: mock_server.uri(),
        token: None,
        timeout_secs: 2,
    })
    .unwrap();
    let store = FactStore::new(Arc::new(backend));

    let hosts = store.read(HOSTS_PATH).await.unwrap();

    assert_eq!(
        hosts,
        Tree::branch()
            .with(
                "h1",
                Tree::branch().with("metadata", Tree::branch().with("sap-environment", "qa"))
            )
            .with("h2", Tree::branch().with("ip", "10.0.0.2"))
    );
}
