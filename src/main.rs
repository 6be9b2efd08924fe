//! Driftnet main entry point
//!
//! This is the command-line interface for the Driftnet crawler and indexer.

use anyhow::Context;
use clap::Parser;
use driftnet::config::{load_config_with_hash, Config};
use driftnet::crawler::crawl;
use driftnet::index::search;
use driftnet::rank::RankEngine;
use driftnet::storage::{self, open_storage};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Driftnet: a polite crawler, indexer and link ranker
///
/// Driftnet crawls the web while respecting robots.txt and crawl delays,
/// builds an inverted index of page text, and ranks pages by link authority.
#[derive(Parser, Debug)]
#[command(name = "driftnet")]
#[command(version)]
#[command(about = "A polite crawler, indexer and link ranker", long_about = None)]
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

    /// Start from the configured seeds, discarding any saved frontier
    #[arg(long)]
    fresh: bool,

    /// Run the ranking job once and exit
    #[arg(long, conflicts_with_all = ["search", "stats", "dry_run"])]
    rank: bool,

    /// Search the index and exit
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["stats", "dry_run"])]
    search: Option<String>,

    /// Only return pages containing every query term
    #[arg(long, requires = "search")]
    all: bool,

    /// Maximum number of search results
    #[arg(long, default_value_t = 10, requires = "search")]
    limit: usize,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(query) = &cli.search {
        handle_search(&config, query, cli.all, cli.limit)?;
    } else if cli.rank {
        handle_rank(&config).await?;
    } else {
        handle_crawl(config, cli.fresh).await?;
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
            0 => EnvFilter::new("driftnet=info,warn"),
            1 => EnvFilter::new("driftnet=debug,info"),
            2 => EnvFilter::new("driftnet=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Driftnet Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!(
        "  Default crawl delay: {}ms",
        config.crawler.default_crawl_delay_ms
    );
    println!(
        "  Retry: {} attempts, {}ms base backoff",
        config.retry.max_attempts, config.retry.base_backoff_ms
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nWorkers:");
    println!(
        "  {}..={} workers, target {:.2} req/s (±{:.0}%) every {}ms",
        config.autoscale.min_workers,
        config.autoscale.max_workers,
        config.autoscale.target_rate,
        config.autoscale.band * 100.0,
        config.autoscale.interval_ms
    );

    println!("\nIndexer:");
    println!(
        "  Intake capacity {}, {} concurrent",
        config.indexer.intake_capacity, config.indexer.max_concurrent
    );

    println!("\nRanking:");
    println!(
        "  Damping {}, up to {} iterations, tolerance {:e}, chunks of {}",
        config.ranking.damping,
        config.ranking.max_iterations,
        config.ranking.tolerance,
        config.ranking.write_chunk_size
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows row counts from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let shared = open_storage(Path::new(&config.output.database_path))?;
    let storage = storage::lock(&shared)?;
    let frontier = storage.load_frontier()?;

    println!("Pages:    {}", storage.count_pages()?);
    println!("Links:    {}", storage.count_links()?);
    println!("Postings: {}", storage.count_postings()?);
    match frontier {
        Some(snapshot) => println!(
            "Frontier: {} high, {} low, {} seen",
            snapshot.high.len(),
            snapshot.low.len(),
            snapshot.seen.len()
        ),
        None => println!("Frontier: not saved"),
    }

    Ok(())
}

/// Handles the --search mode: prints ranked hits for a query
fn handle_search(
    config: &Config,
    query: &str,
    require_all: bool,
    limit: usize,
) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let hits = search(&storage, query, require_all, limit)
        .with_context(|| format!("search for '{}' failed", query))?;

    if hits.is_empty() {
        println!("No results for '{}'", query);
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let rank = hit
            .rank
            .map(|r| format!("{:.6}", r))
            .unwrap_or_else(|| "unranked".to_string());
        println!("{}. {} [{}]", i + 1, hit.url, rank);
        if !hit.title.is_empty() {
            println!("   {}", hit.title);
        }
        if !hit.description.is_empty() {
            println!("   {}", hit.description);
        }
        println!(
            "   {} terms matched, {} occurrences",
            hit.match_count, hit.total_word_count
        );
    }

    Ok(())
}

/// Handles the --rank mode: runs the ranking job once
async fn handle_rank(config: &Config) -> anyhow::Result<()> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    let report = RankEngine::new(storage, config.ranking.clone())
        .run()
        .await
        .context("ranking failed")?;

    println!(
        "✓ Ranked {} URLs: {} pages updated, {} without a page, {} failed chunks",
        report.scored, report.written, report.skipped, report.failed_chunks
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring saved frontier)");
    } else {
        tracing::info!("Starting crawl (will resume a saved frontier if present)");
    }
    tracing::info!("Total seed URLs: {}", config.crawler.seeds.len());

    let storage = open_storage(Path::new(&config.output.database_path))?;

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, shutting down");
                on_signal.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    match crawl(config, storage, fresh, shutdown).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed: {} pages indexed, snapshot {}",
                summary.index.records,
                if summary.snapshot_saved { "saved" } else { "not saved" }
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
