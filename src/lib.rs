//! Listing-Harvest: a product listing harvester
//!
//! This crate pages through an e-commerce site's search results (either the
//! JSON search API or the rendered HTML search pages), normalizes every
//! product into a single record shape, optionally enriches it from its detail
//! page, and hands deduplicated records to a sink in bounded batches.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod product;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Listing-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Run aborted on list page {page}: {reason}")]
    Aborted { page: u32, reason: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised by a single fetch
///
/// Every variant is treated as transient by the retry policy.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// The URL the failed request targeted
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Timeout { url }
            | Self::Network { url, .. }
            | Self::Body { url, .. } => url,
        }
    }
}

/// Errors that can tell whether another attempt may succeed
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Timeouts, connection failures and non-2xx statuses all qualify; the
/// retry policy bounds how many attempts are made.
impl Transient for FetchError {
    fn is_transient(&self) -> bool {
        true
    }
}

/// A malformed list body is retried like a failed fetch; errors raised
/// before anything was sent (a bad URL, for one) are not.
impl Transient for HarvestError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Fetch(err) => err.is_transient(),
            Self::Extract(_) => true,
            _ => false,
        }
    }
}

/// Errors raised while reading a list page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Malformed JSON search response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected search response: {0}")]
    Structure(String),
}

/// Result type alias for Listing-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, HarvestInput};
pub use crawler::{harvest, Orchestrator};
pub use output::{BatchSink, HarvestSummary};
pub use product::ProductRecord;
pub use state::{RunPhase, Session};
