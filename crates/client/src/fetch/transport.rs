//! Outbound HTTP transport.
//!
//! The coordinator talks to the network through the [`Transport`] trait so
//! the policy can be exercised against scripted responses in tests. The
//! production implementation is reqwest.
//!
//! Non-2xx statuses are not transport errors: they come back as ordinary
//! captured responses, because the refresh policy treats them as data.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use kontext_core::CachedResponse;
use reqwest::Client;

/// Faults raised by the transport itself, as opposed to upstream error
/// statuses (which are returned as responses).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// The request failed before a response arrived (connect, TLS,
    /// timeout, redirect loop, malformed URL).
    #[error("request failed: {0}")]
    Request(String),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The response body exceeds the configured size limit.
    ///
    /// Kept separate from the other faults: the coordinator fails the
    /// whole operation on this one instead of recording a failure outcome.
    #[error("response too large: {got} bytes exceeds {limit}")]
    TooLarge { got: usize, limit: usize },
}

/// Abstract HTTP GET used by the fetch coordinator.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a live GET of `url`, capturing status, headers, and body.
    async fn http_get(&self, url: &str) -> Result<CachedResponse, TransportError>;
}

/// Configuration for the reqwest transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// User agent string (default: "kontext/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: "kontext/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http: Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn http_get(&self, url: &str) -> Result<CachedResponse, TransportError> {
        let start = Instant::now();

        let response = self
            .http
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(TransportError::TooLarge { got: len as usize, limit: self.config.max_bytes });
        }

        // Capture headers in response order as owned pairs.
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        if body.len() > self.config.max_bytes {
            return Err(TransportError::TooLarge { got: body.len(), limit: self.config.max_bytes });
        }

        tracing::debug!(
            url,
            status,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "live fetch complete"
        );

        Ok(CachedResponse { status, headers, body: body.to_vec() })
    }
}
