//! Consul KV backend
//!
//! Talks to the Consul HTTP API (`/v1/kv/...`). Values come back base64
//! encoded; folders come back with a `null` value and are reported as empty.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use super::backend::{KvBackend, KvPair};
use super::error::{FactResult, FactStoreError};
use crate::config::ConsulConfig;

const TOKEN_HEADER: &str = "X-Consul-Token";

/// One entry of a `GET /v1/kv/<prefix>?recurse` response
#[derive(Debug, Deserialize)]
struct ConsulEntry {
    #[serde(rename = "Key")]
    key: String,

    #[serde(rename = "Value")]
    value: Option<String>,
}

impl ConsulEntry {
    fn into_pair(self) -> FactResult<KvPair> {
        let value = match self.value {
            Some(encoded) => STANDARD.decode(encoded)?,
            None => Vec::new(),
        };
        Ok(KvPair::new(self.key, value))
    }
}

pub struct ConsulBackend {
    client: reqwest::Client,
    address: String,
    token: Option<String>,
}

impl ConsulBackend {
    pub fn new(config: &ConsulConfig) -> FactResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FactStoreError::BackendError(format!("failed to build HTTP client: {e}")))?;

        debug!("using consul at {}", config.address);

        Ok(Self {
            client,
            address: config.address.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, key: &str) -> String {
        format!("{}/v1/kv/{}", self.address, key.trim_start_matches('/'))
    }

    fn request(&self, method: reqwest::Method, key: &str) -> reqwest::RequestBuilder {
        let request = self.client.request(method, self.url(key));
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    /// Turn non-success statuses into errors, `404` into `None`
    async fn check(response: reqwest::Response) -> FactResult<Option<reqwest::Response>> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FactStoreError::BackendError(format!("HTTP {status}: {body}")));
        }
        Ok(Some(response))
    }
}

#[async_trait]
impl KvBackend for ConsulBackend {
    #[instrument(skip(self))]
    async fn list(&self, prefix: &str) -> FactResult<Vec<KvPair>> {
        let response = self
            .request(reqwest::Method::GET, prefix)
            .query(&[("recurse", "true")])
            .send()
            .await?;

        let Some(response) = Self::check(response).await? else {
            trace!("nothing stored below {prefix}");
            return Ok(Vec::new());
        };

        let entries: Vec<ConsulEntry> = response.json().await?;
        trace!("received {} entries", entries.len());

        entries.into_iter().map(ConsulEntry::into_pair).collect()
    }

    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> FactResult<Option<KvPair>> {
        let response = self.request(reqwest::Method::GET, key).send().await?;

        let Some(response) = Self::check(response).await? else {
            return Ok(None);
        };

        let entries: Vec<ConsulEntry> = response.json().await?;
        entries
            .into_iter()
            .find(|entry| entry.key == key)
            .map(ConsulEntry::into_pair)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn keys(&self, prefix: &str, separator: Option<char>) -> FactResult<Vec<String>> {
        let mut request = self
            .request(reqwest::Method::GET, prefix)
            .query(&[("keys", "true")]);

        if let Some(separator) = separator {
            request = request.query(&[("separator", separator.to_string())]);
        }

        let Some(response) = Self::check(request.send().await?).await? else {
            return Ok(Vec::new());
        };

        Ok(response.json().await?)
    }

    #[instrument(skip(self, pair), fields(key = %pair.key))]
    async fn put(&self, pair: KvPair) -> FactResult<()> {
        let response = self
            .request(reqwest::Method::PUT, &pair.key)
            .body(pair.value)
            .send()
            .await?;

        let Some(response) = Self::check(response).await? else {
            return Err(FactStoreError::BackendError(format!(
                "consul rejected write to {}",
                pair.key
            )));
        };

        let accepted: bool = response.json().await?;
        if !accepted {
            return Err(FactStoreError::BackendError(format!(
                "consul refused write to {}",
                pair.key
            )));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> FactResult<()> {
        let response = self.request(reqwest::Method::DELETE, key).send().await?;

        Self::check(response).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_tree(&self, prefix: &str) -> FactResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, prefix)
            .query(&[("recurse", "true")])
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}
