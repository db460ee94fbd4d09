//! Listing-Harvest main entry point
//!
//! This is the command-line interface for the Listing-Harvest product
//! listing harvester.

use anyhow::Context;
use clap::Parser;
use listing_harvest::config::{
    hash_config_text, load_config_with_hash, validate, Config, CountSetting, HarvestInput,
    OutputFormat, SourceMode,
};
use listing_harvest::crawler::{HttpFetcher, Orchestrator, RequestFactory};
use listing_harvest::output::{open_sink, print_summary};
use listing_harvest::state::Session;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Listing-Harvest: an e-commerce product listing harvester
///
/// Pages through a site's search results (HTML pages or the JSON search
/// API), optionally enriches every product from its detail page, and writes
/// deduplicated records in batches of ten.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version = "1.0.0")]
#[command(about = "An e-commerce product listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Search text
    #[arg(long)]
    query: Option<String>,

    /// Number of products to collect
    #[arg(long, value_name = "N")]
    results_wanted: Option<i64>,

    /// Maximum number of list pages to request
    #[arg(long, value_name = "N")]
    max_pages: Option<i64>,

    /// Skip detail-page enrichment
    #[arg(long)]
    no_details: bool,

    /// Upstream representation: html or api
    #[arg(long)]
    mode: Option<SourceMode>,

    /// Output file ("-" for stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Output format
    #[arg(long, value_parser = ["jsonl", "sqlite"])]
    format: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the first search request without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, hash)
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            (Config::default(), hash_config_text(""))
        }
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    handle_harvest(config, &config_hash, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvest=info,warn"),
            1 => EnvFilter::new("listing_harvest=debug,info"),
            2 => EnvFilter::new("listing_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so JSON lines on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line flags on top of the file configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(query) = &cli.query {
        config.input.query = Some(query.clone());
    }
    if let Some(n) = cli.results_wanted {
        config.input.results_wanted = Some(CountSetting::Integer(n));
    }
    if let Some(n) = cli.max_pages {
        config.input.max_pages = Some(CountSetting::Integer(n));
    }
    if cli.no_details {
        config.input.collect_details = false;
    }
    if let Some(mode) = cli.mode {
        config.source.mode = mode;
    }
    if let Some(path) = &cli.output {
        config.output.path = path.clone();
    }
    match cli.format.as_deref() {
        Some("sqlite") => config.output.format = OutputFormat::Sqlite,
        Some("jsonl") => config.output.format = OutputFormat::Jsonl,
        _ => {}
    }
}

/// Handles the --dry-run mode: shows the resolved run without fetching
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let input = HarvestInput::from_config(&config.input);
    let strategy = config.crawler.effective_strategy(config.source.mode);

    println!("=== Listing-Harvest Dry Run ===\n");

    println!("Input:");
    println!("  Query: {}", input.query);
    if input.is_unbounded() {
        println!("  Results wanted: unbounded");
    } else {
        println!("  Results wanted: {}", input.results_wanted);
    }
    println!("  Max pages: {}", input.max_pages);
    println!("  Collect details: {}", input.collect_details);
    println!(
        "  Proxies: {}",
        input.proxy.as_ref().map(|p| p.urls.len()).unwrap_or(0)
    );

    println!("\nSource:");
    println!("  Mode: {}", config.source.mode);
    println!("  Origin: {}", config.source.origin);
    println!("  Page size: {}", config.source.page_size);

    println!("\nCrawler:");
    println!("  Strategy: {:?}", strategy);
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!(
        "  Attempts per fetch: {} ({}ms apart)",
        config.crawler.max_attempts, config.crawler.retry_delay_ms
    );
    println!(
        "  Timeouts: list {}s, detail {}s",
        config.crawler.list_timeout_secs, config.crawler.detail_timeout_secs
    );

    println!("\nOutput:");
    println!("  Format: {:?}", config.output.format);
    println!("  Path: {}", config.output.path);

    let requests = RequestFactory::new(config, &input.query)?;
    let first = requests.list_request(&Session::new(), 1)?;
    println!("\nFirst request:");
    println!("  GET {}", first.url);

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Runs the harvest and reports the summary
async fn handle_harvest(config: Config, config_hash: &str, quiet: bool) -> anyhow::Result<()> {
    let input = HarvestInput::from_config(&config.input);
    // JSON lines on stdout leave no room for the printed summary
    let show_summary = !quiet && config.output.path != "-";

    let fetcher = HttpFetcher::new(&config.crawler, input.proxy.as_ref())
        .context("failed to build HTTP client")?;
    if input.proxy.is_some() {
        tracing::info!("Rotating requests across {} proxies", fetcher.pool_size());
    }
    let mut sink = open_sink(&config.output, config_hash).context("failed to open output")?;

    let summary = Orchestrator::new(config, input, Arc::new(fetcher))?
        .run(&mut sink)
        .await?;

    if show_summary {
        println!();
        print_summary(&summary);
    }

    if let Some(err) = summary.abort_error() {
        return Err(err.into());
    }

    Ok(())
}
