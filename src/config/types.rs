use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Main configuration structure for Listing-Harvest
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub source: SourceConfig,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
}

/// Run input: what to search for and how much to collect
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct InputConfig {
    /// Search text
    pub query: Option<String>,

    /// Target number of records (numeric or free-form, resolved later)
    pub results_wanted: Option<CountSetting>,

    /// Maximum number of list pages to request
    pub max_pages: Option<CountSetting>,

    /// Whether to fetch each product's detail page
    pub collect_details: bool,

    /// Proxy settings, passed through to the fetcher untouched
    pub proxy_configuration: Option<ProxyConfig>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            query: None,
            results_wanted: None,
            max_pages: None,
            collect_details: true,
            proxy_configuration: None,
        }
    }
}

/// A count as written by the user
///
/// Input files are hand-edited, so counts may arrive as integers, floats or
/// strings. Resolution into a concrete limit happens in `HarvestInput`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CountSetting {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Proxy configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy URLs; requests rotate across them
    pub urls: Vec<String>,
}

/// Which upstream representation to harvest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Rendered HTML search and detail pages
    #[default]
    Html,
    /// Paginated JSON search API
    Api,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html => write!(f, "html"),
            Self::Api => write!(f, "api"),
        }
    }
}

impl FromStr for SourceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "api" => Ok(Self::Api),
            other => Err(format!("unknown source mode '{}' (expected html or api)", other)),
        }
    }
}

/// Upstream site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourceConfig {
    pub mode: SourceMode,

    /// Canonical site origin; relative links resolve against it
    pub origin: String,

    /// Path of the HTML search page
    pub search_path: String,

    /// Base of the JSON search endpoint; the encoded query is appended as a path segment
    pub api_endpoint: String,

    /// API key sent with every search request
    pub api_key: String,

    /// Results requested per page (API mode), also used to derive total pages
    pub page_size: u32,

    pub sort_by: String,
    pub sort_order: String,

    /// Client version tag sent with every search request
    pub client_version: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::Html,
            origin: "https://shophouzz.com".to_string(),
            search_path: "/search".to_string(),
            api_endpoint: "https://ac.cnstrc.com/search".to_string(),
            api_key: String::new(),
            page_size: 24,
            sort_by: "relevance".to_string(),
            sort_order: "descending".to_string(),
            client_version: "ciojs-client-2.35.2".to_string(),
        }
    }
}

/// How list and detail work is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One fetch at a time with a fixed delay between fetches
    Sequential,
    /// Bounded pool of concurrent fetches fed from a FIFO queue
    Pool,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Scheduling model; derived from the source mode when unset
    pub strategy: Option<Strategy>,

    /// Maximum in-flight fetches in pool mode
    pub max_concurrency: u32,

    /// Delay between successive fetches in sequential mode (milliseconds)
    pub request_delay_ms: u64,

    /// Total attempts per fetch, including the first
    pub max_attempts: u32,

    /// Delay between attempts (milliseconds)
    pub retry_delay_ms: u64,

    pub list_timeout_secs: u64,
    pub detail_timeout_secs: u64,

    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            strategy: None,
            max_concurrency: 10,
            request_delay_ms: 500,
            max_attempts: 3,
            retry_delay_ms: 1000,
            list_timeout_secs: 30,
            detail_timeout_secs: 90,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl CrawlerConfig {
    /// Returns the configured strategy, or the natural one for `mode`
    pub fn effective_strategy(&self, mode: SourceMode) -> Strategy {
        self.strategy.unwrap_or(match mode {
            SourceMode::Api => Strategy::Sequential,
            SourceMode::Html => Strategy::Pool,
        })
    }
}

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Destination file; "-" writes JSON lines to stdout
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jsonl,
            path: "products.jsonl".to_string(),
        }
    }
}
