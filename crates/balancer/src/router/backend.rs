//! Proxy calls to backend replicas.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// Default bound on a proxied call.
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(3);

/// What a replica answered. Non-2xx statuses are relayed as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Why a proxied call produced no response.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Performs a GET against a replica.
#[async_trait]
pub trait BackendClient: Send + Sync + 'static {
    /// `address` is the replica's base address (`http://S1:5000`), `path`
    /// the endpoint without leading slash.
    async fn get(&self, address: &str, path: &str) -> Result<BackendResponse, BackendError>;
}

/// [`BackendClient`] over a shared `reqwest` client with a per-call timeout.
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBackendClient {
    pub fn new(timeout: Duration) -> Self {
        // Replicas sit on the local network; environment proxies never apply.
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, timeout }
    }
}

impl Default for HttpBackendClient {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_TIMEOUT)
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn get(&self, address: &str, path: &str) -> Result<BackendResponse, BackendError> {
        let url = format!("{}/{}", address.trim_end_matches('/'), path);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    BackendError::Timeout(self.timeout)
                } else {
                    BackendError::Connect(err.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|err| {
            if err.is_timeout() {
                BackendError::Timeout(self.timeout)
            } else {
                BackendError::Body(err.to_string())
            }
        })?;

        Ok(BackendResponse {
            status,
            content_type,
            body,
        })
    }
}
