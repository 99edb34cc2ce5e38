//! Delivery capabilities for the server stream
//!
//! [`Transport`] is the reliable asynchronous path used on every throttle
//! tick. [`BeaconTransport`] is the fire-and-forget path used once at
//! teardown, when there is no time left to await a response.

#[cfg(feature = "network")]
use crate::core::LoggerError;
use crate::core::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::fmt;

/// One batch upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: String,
    pub url: String,
    pub headers: IndexMap<String, String>,
    /// Send cookies/credentials with cross-origin requests.
    pub with_credentials: bool,
    /// JSON array of records.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Option<String>,
}

impl TransportResponse {
    pub fn new(status: u16) -> Self {
        Self { status, body: None }
    }

    /// Status below 400
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// Why a batch was not delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The server answered with status 400 or above.
    Status(TransportResponse),
    /// The request could not be completed.
    Transport(String),
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryFailure::Status(response) => write!(f, "server responded with status {}", response.status),
            DeliveryFailure::Transport(reason) => write!(f, "transport error: {}", reason),
        }
    }
}

/// Reliable asynchronous delivery.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. `Err` means no response was received; any response,
    /// including 4xx/5xx, is `Ok`.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Fire-and-forget delivery that may outlive the caller.
pub trait BeaconTransport: Send + Sync {
    /// Queue `body` for delivery to `url`. Returns whether it was queued.
    /// Must not panic.
    fn send_beacon(&self, url: &str, body: String) -> bool;
}

/// HTTP transport built on `reqwest`.
///
/// Relative URLs (such as the default `/log`) are resolved against the
/// configured base URL. `with_credentials` only has meaning for browser
/// fetches and is ignored here.
#[cfg(feature = "network")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Option<String>,
}

#[cfg(feature = "network")]
impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Base URL for relative request URLs, e.g. `https://logs.example.com`
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn resolve(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if url.starts_with('/') => format!("{}{}", base.trim_end_matches('/'), url),
            _ => url.to_string(),
        }
    }
}

#[cfg(feature = "network")]
impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "network")]
#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| LoggerError::config("server-stream", format!("invalid method: {}", e)))?;

        let mut builder = self.client.request(method, self.resolve(&request.url));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let resp = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| LoggerError::transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp.text().await.ok();
        Ok(TransportResponse { status, body })
    }
}

#[cfg(feature = "network")]
impl BeaconTransport for HttpTransport {
    /// Spawns the POST on the current tokio runtime without awaiting it.
    fn send_beacon(&self, url: &str, body: String) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return false;
        };
        let request = self
            .client
            .post(self.resolve(url))
            .header("Content-Type", "text/plain")
            .body(body);
        handle.spawn(async move {
            let _ = request.send().await;
        });
        true
    }
}
