//! Fetch/extract worker loop
//!
//! A worker is a plain async function run under a cancellation token. It
//! dequeues a batch from the frontier and processes every URL of the batch
//! concurrently, so one slow fetch never holds up its siblings. Cancellation
//! is checked between batches, never in the middle of a fetch.

use crate::crawler::fetcher::{fetch_page, FetchResult, RetryPolicy};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::metrics::FetchMetrics;
use crate::crawler::parser::parse_html;
use crate::crawler::politeness::PolitenessGate;
use crate::index::{IndexIntake, IndexRecord};
use crate::url::extract_domain;
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything a worker needs, shared by the whole pool
pub struct WorkerContext {
    pub frontier: Arc<Frontier>,
    pub gate: Arc<PolitenessGate>,
    pub client: Client,
    pub intake: IndexIntake,
    pub metrics: Arc<FetchMetrics>,
    pub retry: RetryPolicy,
    /// URLs dequeued and processed concurrently per batch
    pub batch_size: usize,
    /// Sleep when the frontier is empty
    pub idle_backoff: Duration,
}

/// What happened to one dequeued URL
#[derive(Debug)]
pub enum UrlOutcome {
    /// Fetched, extracted and handed to the indexing pipeline
    Indexed { links: usize, discovered: usize },
    /// Not a parseable URL with a host
    Invalid,
    /// robots.txt forbids it; the URL is dropped for good
    Disallowed,
    /// The fetch did not produce an HTML page
    FetchFailed(FetchResult),
    /// The body could not be processed as HTML
    ParseFailed(String),
    /// Extracted, but the indexing pipeline has stopped
    IntakeClosed,
}

/// Runs until `token` is cancelled, finishing the current batch first
pub async fn run_worker(ctx: Arc<WorkerContext>, id: usize, token: CancellationToken) {
    tracing::debug!("Worker {} started", id);

    while !token.is_cancelled() {
        let batch = ctx.frontier.dequeue(ctx.batch_size);
        if batch.is_empty() {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(ctx.idle_backoff) => continue,
            }
        }

        let outcomes = join_all(batch.into_iter().map(|entry| handle_entry(&ctx, entry))).await;
        let indexed = outcomes
            .iter()
            .filter(|o| matches!(o, UrlOutcome::Indexed { .. }))
            .count();
        tracing::trace!("Worker {} finished batch: {}/{} indexed", id, indexed, outcomes.len());
    }

    tracing::debug!("Worker {} stopped", id);
}

async fn handle_entry(ctx: &WorkerContext, entry: FrontierEntry) -> UrlOutcome {
    let outcome = process_url(ctx, &entry.url).await;
    match &outcome {
        UrlOutcome::Indexed { links, discovered } => {
            tracing::debug!("Indexed {} ({} links, {} new)", entry.url, links, discovered)
        }
        UrlOutcome::Invalid => tracing::debug!("Dropped invalid URL {}", entry.url),
        UrlOutcome::Disallowed => tracing::debug!("Dropped {}: disallowed by robots.txt", entry.url),
        UrlOutcome::FetchFailed(result) => {
            tracing::debug!("Dropped {}: {:?}", entry.url, result)
        }
        UrlOutcome::ParseFailed(message) => {
            tracing::debug!("Dropped {}: {}", entry.url, message)
        }
        UrlOutcome::IntakeClosed => {
            tracing::debug!("Dropped {}: indexing pipeline stopped", entry.url)
        }
    }
    outcome
}

/// Takes one URL through politeness, fetch, extraction and hand-off
///
/// # Returns
///
/// The [`UrlOutcome`]; every outcome other than `Indexed` drops the URL
pub async fn process_url(ctx: &WorkerContext, raw_url: &str) -> UrlOutcome {
    let Ok(url) = Url::parse(raw_url) else {
        return UrlOutcome::Invalid;
    };
    let Some(domain) = extract_domain(&url) else {
        return UrlOutcome::Invalid;
    };

    ctx.gate.ensure_robots(&url).await;
    if !ctx.gate.can_fetch(&url) {
        return UrlOutcome::Disallowed;
    }

    let body = match fetch_politely(ctx, &url, &domain).await {
        FetchResult::Success { final_url, body } => {
            if final_url != url.as_str() {
                tracing::debug!("Followed redirect {} -> {}", url, final_url);
            }
            body
        }
        other => return UrlOutcome::FetchFailed(other),
    };

    let parsed = match parse_html(&body, url.as_str()) {
        Ok(parsed) => parsed,
        Err(e) => return UrlOutcome::ParseFailed(e.to_string()),
    };

    let record = IndexRecord {
        url: url.to_string(),
        title: parsed.title.clone(),
        description: parsed.description.clone(),
        outgoing: parsed.outgoing(&domain),
        text: parsed.text.clone(),
    };
    let submitted = ctx.intake.submit(record).await;
    let discovered = ctx.frontier.enqueue(&parsed.links);

    if !submitted {
        return UrlOutcome::IntakeClosed;
    }
    UrlOutcome::Indexed {
        links: parsed.links.len(),
        discovered,
    }
}

/// Fetches `url`, retrying transient failures under the retry policy
///
/// Every attempt, the first included, waits for its own cooldown slot, so
/// retries stay delay-separated from all other requests to the domain. The
/// backoff is slept before the slot is reserved.
async fn fetch_politely(ctx: &WorkerContext, url: &Url, domain: &str) -> FetchResult {
    let crawl_delay = ctx.gate.crawl_delay(domain);
    let mut attempt = 1;

    loop {
        let wait = ctx.gate.next_cooldown(domain, crawl_delay);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let started = Instant::now();
        let result = fetch_page(&ctx.client, url.as_str()).await;
        ctx.metrics.record(started.elapsed());

        if !result.is_transient() || attempt >= ctx.retry.max_attempts {
            return result;
        }

        let backoff = ctx.retry.backoff(attempt);
        tracing::debug!(
            "Attempt {} for {} failed ({:?}), retrying in {:?}",
            attempt,
            url,
            result,
            backoff
        );
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}
