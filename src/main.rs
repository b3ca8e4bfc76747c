//! Ripple-Frontier main entry point
//!
//! This is the command-line host for the Ripple-Frontier crawl engine.

use clap::Parser;
use ripple_frontier::config::{load_config_with_hash, Config};
use ripple_frontier::crawler::{DecisionCode, RunContext, Runner, Services};
use ripple_frontier::fetch::{Fetcher, HttpFetcher, ParserRegistry};
use ripple_frontier::output::{print_summary, write_markdown_report};
use ripple_frontier::pipeline::{page_pipeline, RouteTable, SimpleRoute};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ripple-Frontier: a polite crawl scheduling and execution engine
///
/// Ripple-Frontier crawls the configured seeds while enforcing per-host
/// politeness, retrying failures with backoff and recording every
/// unrecoverable failure in a dead-letter report.
#[derive(Parser, Debug)]
#[command(name = "ripple-frontier")]
#[command(version = "1.0.0")]
#[command(about = "A polite crawl scheduling and execution engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the configured number of concurrent executions
    #[arg(long, value_name = "N")]
    max_in_flight: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(max_in_flight) = cli.max_in_flight {
        if max_in_flight == 0 {
            return Err("--max-in-flight must be at least 1".into());
        }
        config.engine.max_in_flight = max_in_flight;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_frontier=info,warn"),
            1 => EnvFilter::new("ripple_frontier=debug,info"),
            2 => EnvFilter::new("ripple_frontier=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration and seeds
fn handle_dry_run(config: &Config) {
    println!("=== Ripple-Frontier Dry Run ===\n");

    println!("Engine:");
    println!("  Max in flight: {}", config.engine.max_in_flight);
    println!("  Max hops: {}", config.engine.max_hops);
    println!("  Max park: {}ms", config.engine.max_park_ms);

    println!("\nRetry:");
    println!("  Strategy: {:?}", config.retry.strategy);
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Base delay: {}ms", config.retry.base_delay_ms);

    println!("\nPoliteness:");
    println!("  Minimum delay per host: {}ms", config.politeness.minimum_delay_ms);

    println!("\nScope:");
    println!("  Max depth: {}", config.scope.max_depth);
    println!("  Follow external: {}", config.scope.follow_external);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Report: {}", config.output.summary_path);

    println!("\nQuality Domains ({}):", config.quality.len());
    for entry in &config.quality {
        println!("  - {} ({} seeds)", entry.domain, entry.seeds.len());
        for seed in &entry.seeds {
            println!("    * {}", seed);
        }
    }

    println!("\nBlacklisted Domains ({}):", config.blacklist.len());
    for entry in &config.blacklist {
        println!("  - {}", entry.domain);
    }

    println!("\nStubbed Domains ({}):", config.stub.len());
    for entry in &config.stub {
        println!("  - {}", entry.domain);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.quality.iter().map(|q| q.seeds.len()).sum::<usize>()
    );
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Quality domains: {}, Blacklist: {}, Stub: {}",
        config.quality.len(),
        config.blacklist.len(),
        config.stub.len()
    );

    let mut services = Services::new();
    services
        .insert::<Arc<dyn Fetcher>>(Arc::new(HttpFetcher::new(&config.user_agent)?))
        .insert(ParserRegistry::with_html());

    let run = Arc::new(RunContext::from_config(&config, services)?);
    let seeds = run.seed(
        config
            .quality
            .iter()
            .flat_map(|q| q.seeds.iter().map(String::as_str)),
    );
    for rejected in seeds.entries().iter().filter(|d| !d.accepted) {
        tracing::warn!("Seed rejected ({}): {}", rejected.code, rejected.message);
    }
    if seeds.count(DecisionCode::Accepted) == 0 {
        return Err("no seed URL was accepted".into());
    }

    let routes = RouteTable::new().fallback(Arc::new(SimpleRoute::new("page", page_pipeline())));
    let runner = Runner::from_config(Arc::clone(&run), Arc::new(routes), &config.engine)?;

    let summary = runner.run().await;

    print_summary(&summary, &run);

    let report_path = Path::new(&config.output.summary_path);
    write_markdown_report(
        &summary,
        &run.dead_letters().items(),
        Some(config_hash),
        report_path,
    )?;
    println!("\n✓ Report written to: {}", report_path.display());

    Ok(())
}
