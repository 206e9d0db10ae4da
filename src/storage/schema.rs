//! Projected entities
//!
//! Each projector owns the entities of its domain. Entities are keyed by the
//! agent that reported them (or by the cluster id for clusters) and carry the
//! time of the last projection that touched them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of HA cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClusterType {
    HanaScaleUp,
    HanaScaleOut,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterType::HanaScaleUp => write!(f, "hana_scale_up"),
            ClusterType::HanaScaleOut => write!(f, "hana_scale_out"),
            ClusterType::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for ClusterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hana_scale_up" => Ok(ClusterType::HanaScaleUp),
            "hana_scale_out" => Ok(ClusterType::HanaScaleOut),
            "unknown" => Ok(ClusterType::Unknown),
            _ => Err(format!("unknown cluster type: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub cluster_type: ClusterType,
    pub sid: Option<String>,
    pub resources_number: u32,
    pub hosts_number: u32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub agent_id: String,
    pub hostname: String,
    pub ip_addresses: Vec<String>,
    pub agent_version: String,
    pub updated_at: DateTime<Utc>,
}

/// Role of an SAP system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SapSystemType {
    Application,
    Database,
}

impl fmt::Display for SapSystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SapSystemType::Application => write!(f, "application"),
            SapSystemType::Database => write!(f, "database"),
        }
    }
}

impl FromStr for SapSystemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application" => Ok(SapSystemType::Application),
            "database" => Ok(SapSystemType::Database),
            _ => Err(format!("unknown SAP system type: {s}")),
        }
    }
}

/// One SAP instance running on a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SapSystemInstance {
    pub agent_id: String,
    pub sid: String,
    pub system_type: SapSystemType,
    pub instance_number: String,
    pub features: String,
    pub hostname: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlesSubscription {
    pub agent_id: String,
    pub identifier: String,
    pub version: String,
    pub arch: String,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Anonymous sizing facts about a host
///
/// Fed by two event types: host reports fill in the hardware fields, cloud
/// reports fill in the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostTelemetry {
    pub agent_id: String,
    pub hostname: Option<String>,
    pub cpu_count: Option<u32>,
    pub socket_count: Option<u32>,
    pub total_memory_mb: Option<u64>,
    pub sles_version: Option<String>,
    pub cloud_provider: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl HostTelemetry {
    pub fn empty(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            hostname: None,
            cpu_count: None,
            socket_count: None,
            total_memory_mb: None,
            sles_version: None,
            cloud_provider: None,
            updated_at: Utc::now(),
        }
    }
}

/// The hardware columns of a [`HostTelemetry`] record, owned by host reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostSizing {
    pub hostname: Option<String>,
    pub cpu_count: Option<u32>,
    pub socket_count: Option<u32>,
    pub total_memory_mb: Option<u64>,
    pub sles_version: Option<String>,
}
