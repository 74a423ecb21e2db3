//! Remote Store Module
//!
//! HTTP clients for the cache server. Namespaces and keys are hex-encoded
//! into the request path and values travel as raw bodies.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::cache::{AsyncStore, Store};
use crate::error::{MemoError, Result};
use crate::models::{ErrorResponse, SetQuery, SizeResponse};

/// Request timeout used by both clients.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// == URL Layout ==
#[derive(Debug, Clone)]
struct Endpoints {
    base_url: String,
}

impl Endpoints {
    fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(MemoError::Configuration(format!(
                "Remote store URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }
        Ok(Self {
            base_url: base_url.to_string(),
        })
    }

    fn namespace(&self, namespace: &[u8]) -> String {
        format!("{}/ns/{}", self.base_url, hex::encode(namespace))
    }

    fn key(&self, namespace: &[u8], key: &[u8]) -> String {
        format!("{}/keys/{}", self.namespace(namespace), hex::encode(key))
    }

    fn size(&self, namespace: &[u8]) -> String {
        format!("{}/size", self.namespace(namespace))
    }
}

fn status_error(status: StatusCode, body: &str) -> MemoError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|err| err.error)
        .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
    MemoError::Backend(format!("Remote store returned {}: {}", status.as_u16(), message))
}

// == Blocking Client ==
/// Store backed by a remote cache server, for synchronous callers.
///
/// Must not be created or used from inside an async runtime; use
/// [`AsyncHttpStore`] there.
#[derive(Debug, Clone)]
pub struct HttpStore {
    endpoints: Endpoints,
    client: reqwest::blocking::Client,
}

impl HttpStore {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            endpoints: Endpoints::new(base_url)?,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.endpoints.base_url
    }

    fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(status_error(status, &body))
    }
}

impl Store for HttpStore {
    fn get(&self, namespace: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>> {
        let response = self.client.get(self.endpoints.key(namespace, key)).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = Self::check(response)?.bytes()?;
        Ok(Some(bytes.to_vec()))
    }

    fn set(&self, namespace: &[u8], key: &[u8], value: Vec<u8>, ttl: Duration) -> Result<()> {
        let response = self
            .client
            .put(self.endpoints.key(namespace, key))
            .query(&SetQuery::with_ttl(ttl))
            .body(value)
            .send()?;
        Self::check(response)?;
        Ok(())
    }

    fn clear(&self, namespace: &[u8]) -> Result<()> {
        let response = self.client.delete(self.endpoints.namespace(namespace)).send()?;
        Self::check(response)?;
        Ok(())
    }

    fn get_size(&self, namespace: &[u8]) -> Result<usize> {
        let response = self.client.get(self.endpoints.size(namespace)).send()?;
        let size: SizeResponse = Self::check(response)?.json()?;
        Ok(size.size)
    }
}

// == Async Client ==
/// Store backed by a remote cache server, for asynchronous callers.
#[derive(Debug, Clone)]
pub struct AsyncHttpStore {
    endpoints: Endpoints,
    client: reqwest::Client,
}

impl AsyncHttpStore {
    /// Creates a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        // Idle connections are bound to the runtime that opened them, and a
        // synchronous caller drives each request on a fresh runtime.
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            endpoints: Endpoints::new(base_url)?,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.endpoints.base_url
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

#[async_trait]
impl AsyncStore for AsyncHttpStore {
    async fn get(&self, namespace: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(self.endpoints.key(namespace, key))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = Self::check(response).await?.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    async fn set(&self, namespace: &[u8], key: &[u8], value: Vec<u8>, ttl: Duration) -> Result<()> {
        let response = self
            .client
            .put(self.endpoints.key(namespace, key))
            .query(&SetQuery::with_ttl(ttl))
            .body(value)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn clear(&self, namespace: &[u8]) -> Result<()> {
        let response = self
            .client
            .delete(self.endpoints.namespace(namespace))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_size(&self, namespace: &[u8]) -> Result<usize> {
        let response = self
            .client
            .get(self.endpoints.size(namespace))
            .send()
            .await?;
        let size: SizeResponse = Self::check(response).await?.json().await?;
        Ok(size.size)
    }
}
