//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating two-tier frontier
//! - The politeness gate (robots.txt rules and per-domain cooldowns)
//! - HTTP fetching with an optional retry policy
//! - HTML parsing and link extraction
//! - Fetch workers, the resizable pool and its autoscaler
//! - Overall crawl coordination

mod autoscaler;
mod coordinator;
mod fetcher;
mod frontier;
mod metrics;
mod parser;
mod politeness;
mod pool;
mod worker;

pub use autoscaler::{plan, Autoscaler, ScaleDecision};
pub use coordinator::{Coordinator, CrawlSummary};
pub use fetcher::{build_http_client, fetch_page, FetchResult, RetryPolicy};
pub use frontier::{Frontier, FrontierEntry};
pub use metrics::{FetchMetrics, MetricsSample, LATENCY_WINDOW};
pub use parser::{parse_html, ParsedPage};
pub use politeness::PolitenessGate;
pub use pool::WorkerPool;
pub use worker::{process_url, run_worker, UrlOutcome, WorkerContext};

use crate::config::Config;
use crate::storage::SharedStorage;
use crate::DriftnetError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl until `shutdown` is cancelled
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `storage` - Where pages, links and postings are written
/// * `fresh` - Ignore any saved frontier snapshot
/// * `shutdown` - Cancelled to stop the crawl cooperatively
pub async fn crawl(
    config: Config,
    storage: SharedStorage,
    fresh: bool,
    shutdown: CancellationToken,
) -> Result<CrawlSummary, DriftnetError> {
    Coordinator::new(config, storage, fresh).run(shutdown).await
}
