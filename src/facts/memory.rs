//! In-memory key/value backend
//!
//! Keeps entries in an ordered map. Useful for tests and for running the hub
//! without a Consul agent; nothing survives a restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use super::backend::{KvBackend, KvPair};
use super::error::FactResult;

#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn list(&self, prefix: &str) -> FactResult<Vec<KvPair>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| KvPair::new(key.clone(), value.clone()))
            .collect())
    }

    async fn get(&self, key: &str) -> FactResult<Option<KvPair>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .map(|value| KvPair::new(key, value.clone())))
    }

    async fn keys(&self, prefix: &str, separator: Option<char>) -> FactResult<Vec<String>> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = Vec::new();

        for key in entries
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
        {
            let rolled_up = match separator {
                Some(sep) => match key[prefix.len()..].find(sep) {
                    Some(index) => &key[..prefix.len() + index + sep.len_utf8()],
                    None => key.as_str(),
                },
                None => key.as_str(),
            };

            if keys.last().map(String::as_str) != Some(rolled_up) {
                keys.push(rolled_up.to_string());
            }
        }

        Ok(keys)
    }

    async fn put(&self, pair: KvPair) -> FactResult<()> {
        trace!("storing {} bytes at {}", pair.value.len(), pair.key);
        self.entries.write().await.insert(pair.key, pair.value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> FactResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_tree(&self, prefix: &str) -> FactResult<()> {
        self.entries
            .write()
            .await
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}
