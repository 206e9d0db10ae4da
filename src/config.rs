use std::path::PathBuf;

use tracing::trace;

/// Entity storage configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./facts.db")
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub consul: ConsulConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Entity storage (optional - defaults to in-memory)
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConsulConfig {
    #[serde(default = "crate::util::get_consul_addr")]
    pub address: String,
    #[serde(default = "crate::util::get_consul_token")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: crate::util::get_consul_addr(),
            token: crate::util::get_consul_token(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent projection workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Events that can wait in the channel before submitters block
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_workers() -> usize {
    8
}

fn default_channel_capacity() -> usize {
    64
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    parse_config(&file_content)
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
