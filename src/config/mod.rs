//! Configuration module for Listing-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and resolving the user-facing input section into the concrete
//! limits the harvester runs with.
//!
//! # Example
//!
//! ```no_run
//! use listing_harvest::config::{load_config, HarvestInput};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! let input = HarvestInput::from_config(&config.input);
//! println!("Harvesting up to {} results for '{}'", input.results_wanted, input.query);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CountSetting, CrawlerConfig, InputConfig, OutputConfig, OutputFormat, ProxyConfig,
    SourceConfig, SourceMode, Strategy,
};

// Re-export parser functions
pub use parser::{hash_config_text, load_config, load_config_with_hash, parse_config};
pub use validation::validate;

/// Search text used when the input has none
pub const DEFAULT_QUERY: &str = "sofa";

/// Target result count when none is given
pub const DEFAULT_RESULTS_WANTED: usize = 20;

/// Page cap when none is given
pub const DEFAULT_MAX_PAGES: u32 = 20;

/// Page cap when the given value is not a number
pub const FALLBACK_MAX_PAGES: u32 = 999;

/// Resolved run input handed to the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestInput {
    pub query: String,

    /// Target record count; `usize::MAX` means unbounded
    pub results_wanted: usize,

    pub max_pages: u32,
    pub collect_details: bool,
    pub proxy: Option<ProxyConfig>,
}

impl HarvestInput {
    /// Resolves raw input settings into concrete limits
    ///
    /// | setting | absent | not a number | below 1 |
    /// |---------|--------|--------------|---------|
    /// | results-wanted | 20 | unbounded | 1 |
    /// | max-pages | 20 | 999 | 1 |
    pub fn from_config(input: &InputConfig) -> Self {
        let query = input
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(DEFAULT_QUERY)
            .to_string();

        let results_wanted = match input.results_wanted.as_ref() {
            None => DEFAULT_RESULTS_WANTED,
            Some(setting) => resolve_count(setting)
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
                .unwrap_or(usize::MAX),
        };

        let max_pages = match input.max_pages.as_ref() {
            None => DEFAULT_MAX_PAGES,
            Some(setting) => resolve_count(setting)
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .unwrap_or(FALLBACK_MAX_PAGES),
        };

        Self {
            query,
            results_wanted,
            max_pages,
            collect_details: input.collect_details,
            proxy: input.proxy_configuration.clone(),
        }
    }

    /// Returns true when no target count limits the run
    pub fn is_unbounded(&self) -> bool {
        self.results_wanted == usize::MAX
    }
}

impl Default for HarvestInput {
    fn default() -> Self {
        Self::from_config(&InputConfig::default())
    }
}

/// Resolves a count setting to a value of at least 1, or None if it is not a finite number
fn resolve_count(setting: &CountSetting) -> Option<u64> {
    let value = match setting {
        CountSetting::Integer(n) => return Some((*n).max(1) as u64),
        CountSetting::Float(f) => *f,
        CountSetting::Text(s) => s.trim().parse::<f64>().ok()?,
    };

    if !value.is_finite() {
        return None;
    }

    Some(if value < 1.0 { 1 } else { value.trunc() as u64 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_with(results: Option<CountSetting>, pages: Option<CountSetting>) -> InputConfig {
        InputConfig {
            results_wanted: results,
            max_pages: pages,
            ..InputConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let input = HarvestInput::default();
        assert_eq!(input.query, "sofa");
        assert_eq!(input.results_wanted, 20);
        assert_eq!(input.max_pages, 20);
        assert!(input.collect_details);
        assert!(input.proxy.is_none());
    }

    #[test]
    fn test_blank_query_falls_back() {
        let config = InputConfig {
            query: Some("   ".to_string()),
            ..InputConfig::default()
        };
        assert_eq!(HarvestInput::from_config(&config).query, "sofa");

        let config = InputConfig {
            query: Some("  armchair ".to_string()),
            ..InputConfig::default()
        };
        assert_eq!(HarvestInput::from_config(&config).query, "armchair");
    }

    #[test]
    fn test_counts_clamped_to_one() {
        let input = HarvestInput::from_config(&input_with(
            Some(CountSetting::Integer(0)),
            Some(CountSetting::Integer(-4)),
        ));
        assert_eq!(input.results_wanted, 1);
        assert_eq!(input.max_pages, 1);
    }

    #[test]
    fn test_invalid_counts_use_sentinels() {
        let input = HarvestInput::from_config(&input_with(
            Some(CountSetting::Text("many".to_string())),
            Some(CountSetting::Float(f64::NAN)),
        ));
        assert!(input.is_unbounded());
        assert_eq!(input.max_pages, FALLBACK_MAX_PAGES);
    }

    #[test]
    fn test_numeric_strings_and_floats() {
        let input = HarvestInput::from_config(&input_with(
            Some(CountSetting::Text(" 35 ".to_string())),
            Some(CountSetting::Float(3.7)),
        ));
        assert_eq!(input.results_wanted, 35);
        assert_eq!(input.max_pages, 3);
    }
}
