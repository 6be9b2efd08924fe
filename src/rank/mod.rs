//! Link-graph ranking job
//!
//! Loads every link record, runs PageRank over the resulting graph and writes
//! each score into the matching page's `rank`. Scores for URLs that were
//! linked to but never indexed have no page and are skipped. Writes go out
//! in fixed-size chunks flushed concurrently; a failed chunk is logged and
//! does not stop the others.

mod pagerank;

pub use pagerank::{pagerank, PageRankResult};

use crate::config::RankingConfig;
use crate::storage::{self, SharedStorage};
use crate::DriftnetError;
use futures::future::join_all;

/// Outcome of one ranking run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankReport {
    /// Nodes in the link graph
    pub scored: usize,
    pub iterations: u32,
    pub converged: bool,
    /// Page ranks updated
    pub written: usize,
    /// Scores without a matching page
    pub skipped: usize,
    pub failed_chunks: usize,
}

pub struct RankEngine {
    storage: SharedStorage,
    config: RankingConfig,
}

impl RankEngine {
    pub fn new(storage: SharedStorage, config: RankingConfig) -> Self {
        Self { storage, config }
    }

    /// Runs one full ranking pass
    ///
    /// # Returns
    ///
    /// * `Ok(RankReport)` - Scores were computed; failed write chunks are
    ///   counted in the report
    /// * `Err(DriftnetError)` - The link graph or page ids could not be loaded
    pub async fn run(&self) -> Result<RankReport, DriftnetError> {
        let storage = self.storage.clone();
        let (links, page_ids) = tokio::task::spawn_blocking(move || {
            let storage = storage::lock(&storage)?;
            Ok::<_, DriftnetError>((storage.load_links()?, storage.load_page_ids()?))
        })
        .await??;

        tracing::info!(
            "Ranking {} link records against {} pages",
            links.len(),
            page_ids.len()
        );

        let config = self.config.clone();
        let result = tokio::task::spawn_blocking(move || {
            pagerank(
                &links,
                config.damping,
                config.max_iterations,
                config.tolerance,
            )
        })
        .await?;

        if !result.converged {
            tracing::warn!(
                "PageRank did not converge within {} iterations",
                result.iterations
            );
        }

        let mut report = RankReport {
            scored: result.scores.len(),
            iterations: result.iterations,
            converged: result.converged,
            ..Default::default()
        };

        let mut updates = Vec::with_capacity(result.scores.len());
        for (url, score) in &result.scores {
            match page_ids.get(url) {
                Some(&id) => updates.push((id, *score)),
                None => report.skipped += 1,
            }
        }

        let chunk_size = self.config.write_chunk_size.max(1);
        let flushes = updates.chunks(chunk_size).map(|chunk| {
            let storage = self.storage.clone();
            let chunk = chunk.to_vec();
            tokio::task::spawn_blocking(move || {
                storage::lock(&storage).and_then(|mut s| s.update_ranks(&chunk))
            })
        });

        for (index, flushed) in join_all(flushes).await.into_iter().enumerate() {
            match flushed {
                Ok(Ok(written)) => report.written += written,
                Ok(Err(e)) => {
                    tracing::warn!("Failed to write rank chunk {}: {}", index, e);
                    report.failed_chunks += 1;
                }
                Err(e) => {
                    tracing::warn!("Rank chunk {} task failed: {}", index, e);
                    report.failed_chunks += 1;
                }
            }
        }

        tracing::info!(
            "Ranking finished after {} iterations: {} ranks written, {} skipped, {} failed chunks",
            report.iterations,
            report.written,
            report.skipped,
            report.failed_chunks
        );
        Ok(report)
    }
}
