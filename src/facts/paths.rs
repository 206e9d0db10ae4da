//! Well-known locations in the key/value store
//!
//! The agents write below these paths, so they form a (versioned) protocol
//! between hub and agents. Changing them breaks compatibility with deployed
//! agents.

pub const CLUSTERS_PATH: &str = "trento/v0/clusters";
pub const HOSTS_PATH: &str = "trento/v0/hosts";
pub const ENVIRONMENTS_PATH: &str = "trento/v0/environments";

pub const METADATA_SAP_ENVIRONMENT: &str = "sap-environment";
pub const METADATA_SAP_LANDSCAPE: &str = "sap-landscape";
pub const METADATA_SAP_SYSTEM: &str = "sap-system";

/// Placeholder environment/landscape for systems without metadata
pub const UNGROUPED: &str = "ungrouped";

pub fn cluster_path(cluster_id: &str) -> String {
    format!("{CLUSTERS_PATH}/{cluster_id}")
}

pub fn host_path(host: &str) -> String {
    format!("{HOSTS_PATH}/{host}")
}

pub fn host_metadata_path(host: &str) -> String {
    format!("{HOSTS_PATH}/{host}/metadata")
}

pub fn host_sap_systems_path(host: &str) -> String {
    format!("{HOSTS_PATH}/{host}/sapsystems")
}

pub fn environment_sap_system_path(environment: &str, landscape: &str, sid: &str) -> String {
    format!("{ENVIRONMENTS_PATH}/{environment}/landscapes/{landscape}/sapsystems/{sid}/")
}
