use crate::config::types::{
    Config, CrawlerConfig, InputConfig, OutputConfig, OutputFormat, SourceConfig, SourceMode,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_input_config(&config.input)?;
    validate_source_config(&config.source)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates run input
fn validate_input_config(config: &InputConfig) -> Result<(), ConfigError> {
    if let Some(proxy) = &config.proxy_configuration {
        for proxy_url in &proxy.urls {
            let url = Url::parse(proxy_url).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", proxy_url, e))
            })?;
            if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
                return Err(ConfigError::Validation(format!(
                    "Proxy URL '{}' has unsupported scheme '{}'",
                    proxy_url,
                    url.scheme()
                )));
            }
        }
    }

    Ok(())
}

/// Validates upstream source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    validate_http_url("origin", &config.origin)?;

    if !config.search_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "search-path must start with '/', got '{}'",
            config.search_path
        )));
    }

    if config.page_size < 1 || config.page_size > 200 {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and 200, got {}",
            config.page_size
        )));
    }

    if config.mode == SourceMode::Api {
        validate_http_url("api-endpoint", &config.api_endpoint)?;

        if config.api_key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "api-key is required when mode = \"api\"".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.list_timeout_secs == 0 || config.detail_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "fetch timeouts must be at least 1 second".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if config.format == OutputFormat::Sqlite && config.path == "-" {
        return Err(ConfigError::Validation(
            "sqlite output needs a file path, not stdout".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
