//! Crawler coordinator - top-level crawl orchestration
//!
//! This module wires the crawl together and owns its lifecycle:
//! - Restoring the saved frontier snapshot, or seeding a fresh frontier
//! - Starting the indexing pipeline and the worker pool
//! - Running the autoscaler until shutdown is requested
//! - Draining workers and the pipeline, then saving the snapshot

use crate::config::Config;
use crate::crawler::autoscaler::Autoscaler;
use crate::crawler::fetcher::{build_http_client, RetryPolicy};
use crate::crawler::frontier::Frontier;
use crate::crawler::metrics::FetchMetrics;
use crate::crawler::politeness::PolitenessGate;
use crate::crawler::pool::WorkerPool;
use crate::crawler::worker::WorkerContext;
use crate::index::{index_channel, IndexStats};
use crate::storage::{self, SharedStorage};
use crate::DriftnetError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Totals reported when a crawl stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub index: IndexStats,
    /// URLs ever enqueued
    pub seen: usize,
    /// URLs left in the high and low tiers
    pub queued: (usize, usize),
    /// Domains with politeness state
    pub domains: usize,
    pub snapshot_saved: bool,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    storage: SharedStorage,
    fresh: bool,
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `storage` - Storage shared with the indexing pipeline
    /// * `fresh` - Discard any saved frontier snapshot and start from the seeds
    pub fn new(config: Config, storage: SharedStorage, fresh: bool) -> Self {
        Self {
            config,
            storage,
            fresh,
        }
    }

    /// Crawls and indexes until `shutdown` is cancelled
    ///
    /// Workers finish their in-flight batch, the pipeline indexes whatever
    /// was already submitted, and the frontier is saved on a best-effort
    /// basis before returning.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The crawl stopped cleanly
    /// * `Err(DriftnetError)` - Startup failed or the pipeline task panicked
    pub async fn run(self, shutdown: CancellationToken) -> Result<CrawlSummary, DriftnetError> {
        let crawler = &self.config.crawler;
        let client = build_http_client(&self.config.user_agent, crawler.request_timeout())?;
        let gate = Arc::new(PolitenessGate::new(
            client.clone(),
            self.config.user_agent.crawler_name.clone(),
            crawler.default_crawl_delay(),
        ));
        let frontier = Arc::new(self.restore_or_seed(&gate)?);

        let (intake, pipeline) = index_channel(Arc::clone(&self.storage), &self.config.indexer);
        let pipeline = tokio::spawn(pipeline.run());

        let metrics = Arc::new(FetchMetrics::new());
        let ctx = Arc::new(WorkerContext {
            frontier: Arc::clone(&frontier),
            gate: Arc::clone(&gate),
            client,
            intake,
            metrics: Arc::clone(&metrics),
            retry: RetryPolicy::from(&self.config.retry),
            batch_size: crawler.batch_size,
            idle_backoff: crawler.idle_backoff(),
        });

        let mut pool = WorkerPool::new(ctx);
        pool.spawn(self.config.autoscale.min_workers);
        tracing::info!(
            "Crawl started with {} workers ({} queued)",
            pool.active(),
            frontier.queued().0 + frontier.queued().1
        );

        let autoscaler = Autoscaler::new(pool, metrics, self.config.autoscale.clone());
        let pool = autoscaler.run(shutdown).await;

        tracing::info!("Shutdown requested, waiting for in-flight batches");
        // Dropping the pool drops the last intake sender, which ends the pipeline
        pool.shutdown().await;
        let index = pipeline.await?;

        let snapshot_saved = self.save_snapshot(&frontier, &gate);
        let summary = CrawlSummary {
            index,
            seen: frontier.seen_count(),
            queued: frontier.queued(),
            domains: gate.domain_count(),
            snapshot_saved,
        };

        tracing::info!(
            "Crawl stopped: {} pages indexed, {} URLs seen, {}+{} queued across {} domains",
            summary.index.records,
            summary.seen,
            summary.queued.0,
            summary.queued.1,
            summary.domains
        );
        Ok(summary)
    }

    /// Restores the saved frontier and robots cache, or seeds a new frontier
    fn restore_or_seed(&self, gate: &PolitenessGate) -> Result<Frontier, DriftnetError> {
        let snapshot = {
            let mut storage = storage::lock(&self.storage)?;
            if self.fresh {
                storage.clear_frontier()?;
                None
            } else {
                storage.load_frontier()?
            }
        };

        match snapshot {
            Some(snapshot) if !snapshot.is_empty() => {
                let frontier = Frontier::restore(&snapshot);
                let robots = gate.restore_robots(&snapshot.robots);
                let (high, low) = frontier.queued();
                tracing::info!(
                    "Resuming: {} URLs seen, {}+{} queued, robots.txt cached for {} domains",
                    frontier.seen_count(),
                    high,
                    low,
                    robots
                );
                if high + low == 0 {
                    tracing::warn!("Saved frontier has nothing queued; use --fresh to reseed");
                }
                Ok(frontier)
            }
            _ => {
                let frontier = Frontier::new();
                let added = frontier.enqueue(&self.config.crawler.seeds);
                tracing::info!("Seeded frontier with {} URLs", added);
                Ok(frontier)
            }
        }
    }

    /// Saves the frontier and robots cache, logging instead of failing
    fn save_snapshot(&self, frontier: &Frontier, gate: &PolitenessGate) -> bool {
        let mut snapshot = frontier.snapshot();
        snapshot.robots = gate.robots_snapshot();

        match storage::lock(&self.storage).and_then(|mut s| s.save_frontier(&snapshot)) {
            Ok(()) => {
                tracing::info!(
                    "Saved frontier snapshot ({} seen, {} robots entries)",
                    snapshot.seen.len(),
                    snapshot.robots.len()
                );
                true
            }
            Err(e) => {
                tracing::warn!("Failed to save frontier snapshot: {}", e);
                false
            }
        }
    }
}
