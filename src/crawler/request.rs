//! Outbound request descriptors
//!
//! The orchestrator never talks to reqwest directly; it builds
//! [`FetchRequest`] values here and hands them to a [`Fetcher`].
//!
//! [`Fetcher`]: crate::crawler::Fetcher

use crate::config::{Config, SourceConfig, SourceMode};
use crate::state::Session;
use crate::url::{api_search_url, html_search_url, SearchIdentity};
use crate::ConfigError;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// What a request is fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A page of search results
    List { page: u32 },
    /// A product detail page
    Detail,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List { page } => write!(f, "LIST page {}", page),
            Self::Detail => write!(f, "DETAIL"),
        }
    }
}

/// A single outbound GET request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: Url,

    /// Extra headers on top of the client defaults
    pub headers: Vec<(String, String)>,

    /// Which proxy (client) to send through; fetchers take it modulo their pool
    pub proxy_slot: usize,

    pub timeout: Duration,
    pub kind: RequestKind,
}

/// Builds list and detail requests for one run
///
/// Rotates `proxy_slot` round-robin across requests and, in API mode,
/// consumes one session sequence number per search request. Clones share
/// the rotation, so pool workers keep it round-robin.
#[derive(Debug, Clone)]
pub struct RequestFactory {
    mode: SourceMode,
    source: SourceConfig,
    origin: Url,
    query: String,
    list_timeout: Duration,
    detail_timeout: Duration,
    issued: Arc<AtomicUsize>,
}

impl RequestFactory {
    /// Creates a factory for `query` against the configured source
    pub fn new(config: &Config, query: &str) -> Result<Self, ConfigError> {
        let origin = Url::parse(&config.source.origin)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.source.origin, e)))?;

        Ok(Self {
            mode: config.source.mode,
            source: config.source.clone(),
            origin,
            query: query.to_string(),
            list_timeout: Duration::from_secs(config.crawler.list_timeout_secs),
            detail_timeout: Duration::from_secs(config.crawler.detail_timeout_secs),
            issued: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Site origin that relative links resolve against
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    /// Builds the search request for `page`
    ///
    /// Call once per attempt: every API search takes a fresh sequence number.
    pub fn list_request(
        &self,
        session: &Session,
        page: u32,
    ) -> Result<FetchRequest, url::ParseError> {
        let (url, accept) = match self.mode {
            SourceMode::Html => (
                html_search_url(&self.origin, &self.source.search_path, &self.query, page)?,
                "text/html,application/xhtml+xml",
            ),
            SourceMode::Api => {
                let sequence = session.next_sequence();
                let identity = SearchIdentity {
                    visitor_id: session.visitor_id(),
                    sequence,
                };
                (
                    api_search_url(&self.source, &self.query, identity, page)?,
                    "application/json",
                )
            }
        };

        let mut headers = vec![("Accept".to_string(), accept.to_string())];
        if self.mode == SourceMode::Api {
            headers.push(("Origin".to_string(), origin_header(&self.origin)));
        }

        Ok(FetchRequest {
            url,
            headers,
            proxy_slot: self.next_slot(),
            timeout: self.list_timeout,
            kind: RequestKind::List { page },
        })
    }

    /// Builds the request for a product detail page
    pub fn detail_request(&self, product_url: &str) -> Result<FetchRequest, url::ParseError> {
        Ok(FetchRequest {
            url: Url::parse(product_url)?,
            headers: vec![(
                "Accept".to_string(),
                "text/html,application/xhtml+xml".to_string(),
            )],
            proxy_slot: self.next_slot(),
            timeout: self.detail_timeout,
            kind: RequestKind::Detail,
        })
    }

    fn next_slot(&self) -> usize {
        self.issued.fetch_add(1, Ordering::Relaxed)
    }
}

fn origin_header(origin: &Url) -> String {
    origin.origin().ascii_serialization()
}
