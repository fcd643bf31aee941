//! doc-harvest main entry point
//!
//! Command-line driver for the harvesting engine: loads configuration,
//! fetches the given seed URLs and writes the report as JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use doc_harvest::config::{load_config_with_hash, validate, Config};
use doc_harvest::crawler::{EnqueueOutcome, Frontier, Harvester, UrlCandidate};
use doc_harvest::output::write_report;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// doc-harvest: a polite documentation fetcher
///
/// Fetches documentation pages starting from the given URLs, follows
/// documentation links one hop, strips navigation and boilerplate and drops
/// near-duplicate pages. The report is printed as JSON.
#[derive(Parser, Debug)]
#[command(name = "doc-harvest")]
#[command(version)]
#[command(about = "A polite documentation fetcher", long_about = None)]
struct Cli {
    /// Seed URLs to start from
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the JSON report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Bypass the page cache for this run
    #[arg(long)]
    no_cache: bool,

    /// Validate config and show the fetch order without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            let config = Config::default();
            validate(&config).context("default configuration is invalid")?;
            config
        }
    };

    if cli.no_cache {
        config.cache.enabled = false;
    }

    if cli.urls.is_empty() {
        bail!("no seed URLs given");
    }

    if cli.dry_run {
        handle_dry_run(&config, &cli.urls);
        return Ok(());
    }

    handle_harvest(config, &cli.urls, cli.output.as_ref()).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only the report.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("doc_harvest=info,warn"),
            1 => EnvFilter::new("doc_harvest=debug,info"),
            2 => EnvFilter::new("doc_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --dry-run: shows the settings and the order seeds would be fetched in
fn handle_dry_run(config: &Config, urls: &[String]) {
    println!("=== doc-harvest Dry Run ===\n");

    println!("Engine:");
    println!("  Concurrency: {}", config.engine.concurrency);
    println!(
        "  Per-domain interval: {}ms",
        config.engine.min_domain_interval_ms
    );
    println!("  Attempt budget: {}", config.engine.attempt_budget);
    println!("  Run deadline: {}s", config.engine.run_deadline_secs);
    println!("  Max documents: {}", config.engine.max_documents);
    println!("  Respect robots.txt: {}", config.engine.respect_robots);

    println!("\nCache:");
    if config.cache.enabled {
        println!("  Directory: {}", config.cache.directory_path().display());
        println!("  TTL: {}s", config.cache.ttl_secs);
        println!("  Max entries: {}", config.cache.max_entries);
    } else {
        println!("  Disabled");
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    let mut frontier = Frontier::new();
    let mut invalid = Vec::new();
    for url in urls {
        match UrlCandidate::seed(url) {
            Ok(candidate) => {
                if let EnqueueOutcome::Merged { .. } = frontier.enqueue(candidate) {
                    println!("  (duplicate seed merged: {})", url);
                }
            }
            Err(e) => invalid.push((url, e)),
        }
    }

    let order = frontier.dequeue_batch(frontier.size());
    println!("\nFetch order ({}):", order.len());
    for candidate in &order {
        println!("  [{}] {}", candidate.score, candidate.normalized_url);
    }

    if !invalid.is_empty() {
        println!("\nInvalid seeds ({}):", invalid.len());
        for (url, e) in &invalid {
            println!("  - {}: {}", url, e);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest
async fn handle_harvest(config: Config, urls: &[String], output: Option<&PathBuf>) -> Result<()> {
    let roots = config.security.allowed_root_paths();

    tracing::info!("Seed URLs: {}", urls.len());
    let harvester = Harvester::new(config).context("failed to set up harvester")?;
    let report = harvester.run(urls).await.context("harvest failed")?;

    match output {
        Some(path) => write_report(&report, path, &roots)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => println!("{}", report.to_json().context("failed to serialize report")?),
    }

    Ok(())
}
