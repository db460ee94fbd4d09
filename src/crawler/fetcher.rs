//! HTTP fetcher implementation
//!
//! This module handles all outbound requests for the harvester:
//! - The [`Fetcher`] capability the orchestrator is written against
//! - An HTTP implementation with one client per configured proxy
//! - Error classification into [`FetchError`]
//! - A fixed-delay retry policy shared by list and detail fetches

use crate::config::{CrawlerConfig, ProxyConfig};
use crate::crawler::request::FetchRequest;
use crate::{FetchError, Transient};
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Body and metadata of a successful fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code (always 2xx)
    pub status: u16,
    pub body: String,
}

/// Capability to perform a single GET request
///
/// Implementations must treat every non-2xx status as an error.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// reqwest-backed fetcher
///
/// Holds one client per proxy (or a single direct client) and picks one by
/// the request's `proxy_slot`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    clients: Vec<Client>,
}

impl HttpFetcher {
    /// Builds the client pool
    ///
    /// # Arguments
    ///
    /// * `config` - Crawler settings (user agent)
    /// * `proxy` - Optional proxy list; each URL gets its own client
    pub fn new(config: &CrawlerConfig, proxy: Option<&ProxyConfig>) -> Result<Self, reqwest::Error> {
        let proxy_urls = proxy.map(|p| p.urls.as_slice()).unwrap_or_default();

        let clients = if proxy_urls.is_empty() {
            vec![build_http_client(config, None)?]
        } else {
            proxy_urls
                .iter()
                .map(|url| build_http_client(config, Some(Proxy::all(url.as_str())?)))
                .collect::<Result<Vec<_>, _>>()?
        };

        tracing::debug!("HTTP fetcher ready with {} client(s)", clients.len());
        Ok(Self { clients })
    }

    /// Number of clients in the rotation
    pub fn pool_size(&self) -> usize {
        self.clients.len()
    }

    fn client_for(&self, slot: usize) -> &Client {
        &self.clients[slot % self.clients.len()]
    }
}

/// Builds an HTTP client with the configured user agent
///
/// Compression is negotiated automatically; timeouts are applied per request.
pub fn build_http_client(config: &CrawlerConfig, proxy: Option<Proxy>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }

    builder.build()
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = request.url.to_string();

        let mut builder = self
            .client_for(request.proxy_slot)
            .get(request.url.clone())
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.clone() }
            } else {
                FetchError::Body {
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        Ok(FetchResponse {
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Bounded, fixed-delay retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.retry_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Runs `operation` until it succeeds or `policy` runs out of attempts
///
/// Each failed attempt but the last is logged with `what` and followed by
/// the policy delay. A non-transient error ends the loop at once. The last
/// error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, what: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display + Transient,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts && err.is_transient() => {
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying: {}",
                    what,
                    attempt,
                    attempts,
                    err
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
