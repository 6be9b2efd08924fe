//! Indexing pipeline: bounded intake drained by concurrent indexing tasks
//!
//! Fetch workers submit [`IndexRecord`]s through an [`IndexIntake`]. When the
//! intake is full, `submit` waits, so a fetch rate above index throughput
//! slows the workers down instead of growing memory. Each record is written
//! as three independent upserts; one failing does not undo the others.

use crate::config::IndexerConfig;
use crate::index::term_counts;
use crate::storage::{self, LinkRecord, PageRecord, SharedStorage};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Page content extracted by a fetch worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    /// Cross-domain links, one per target domain
    pub outgoing: Vec<String>,
    pub text: String,
}

/// Producer side of the pipeline, cloned into every fetch worker
#[derive(Debug, Clone)]
pub struct IndexIntake {
    tx: mpsc::Sender<IndexRecord>,
}

impl IndexIntake {
    /// Queues a record, waiting while the intake is full
    ///
    /// Returns false if the pipeline has stopped.
    pub async fn submit(&self, record: IndexRecord) -> bool {
        self.tx.send(record).await.is_ok()
    }

    /// Intake paired with a bare receiver, for reading records directly
    #[cfg(test)]
    pub(crate) fn from_channel(capacity: usize) -> (Self, mpsc::Receiver<IndexRecord>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

/// Which writes of one record succeeded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOutcome {
    pub page_written: bool,
    pub links_written: bool,
    /// Number of terms written, `None` if the postings write failed
    pub postings_written: Option<usize>,
}

impl IndexOutcome {
    pub fn is_complete(&self) -> bool {
        self.page_written && self.links_written && self.postings_written.is_some()
    }
}

/// Totals reported when the pipeline finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub records: u64,
    pub partial_failures: u64,
    pub terms_written: u64,
}

/// Consumer side of the pipeline
pub struct IndexPipeline {
    rx: mpsc::Receiver<IndexRecord>,
    storage: SharedStorage,
    max_concurrent: usize,
}

/// Creates a connected intake and pipeline
pub fn index_channel(storage: SharedStorage, config: &IndexerConfig) -> (IndexIntake, IndexPipeline) {
    let (tx, rx) = mpsc::channel(config.intake_capacity.max(1));
    (
        IndexIntake { tx },
        IndexPipeline {
            rx,
            storage,
            max_concurrent: config.max_concurrent.max(1),
        },
    )
}

impl IndexPipeline {
    /// Drains the intake until every [`IndexIntake`] is dropped
    ///
    /// At most `max_concurrent` records are indexed at once. Records still
    /// in flight when the intake closes are finished before returning.
    pub async fn run(mut self) -> IndexStats {
        let mut tasks: JoinSet<IndexOutcome> = JoinSet::new();
        let mut stats = IndexStats::default();

        loop {
            while tasks.len() >= self.max_concurrent {
                if let Some(joined) = tasks.join_next().await {
                    account(&mut stats, joined);
                }
            }

            let Some(record) = self.rx.recv().await else {
                break;
            };

            let storage = self.storage.clone();
            tasks.spawn_blocking(move || index_record(&storage, &record));
        }

        while let Some(joined) = tasks.join_next().await {
            account(&mut stats, joined);
        }

        tracing::info!(
            "Indexing pipeline stopped: {} records, {} partial failures, {} terms written",
            stats.records,
            stats.partial_failures,
            stats.terms_written
        );
        stats
    }
}

fn account(stats: &mut IndexStats, joined: Result<IndexOutcome, tokio::task::JoinError>) {
    stats.records += 1;
    match joined {
        Ok(outcome) => {
            if !outcome.is_complete() {
                stats.partial_failures += 1;
            }
            stats.terms_written += outcome.postings_written.unwrap_or(0) as u64;
        }
        Err(e) => {
            tracing::warn!("Indexing task failed: {}", e);
            stats.partial_failures += 1;
        }
    }
}

/// Writes one record: page, then links, then postings
///
/// Each write takes the storage lock separately and failures are logged, so
/// a failed postings write leaves the page and links in place.
pub fn index_record(storage: &SharedStorage, record: &IndexRecord) -> IndexOutcome {
    let counts = term_counts(&record.text);
    let mut outcome = IndexOutcome::default();

    let page = PageRecord {
        url: record.url.clone(),
        title: record.title.clone(),
        description: record.description.clone(),
    };
    match storage::lock(storage).and_then(|mut s| s.upsert_page(&page)) {
        Ok(_) => outcome.page_written = true,
        Err(e) => tracing::warn!("Failed to write page {}: {}", record.url, e),
    }

    let links = LinkRecord {
        url: record.url.clone(),
        outgoing: record.outgoing.clone(),
    };
    match storage::lock(storage).and_then(|mut s| s.upsert_links(&links)) {
        Ok(()) => outcome.links_written = true,
        Err(e) => tracing::warn!("Failed to write links for {}: {}", record.url, e),
    }

    match storage::lock(storage).and_then(|mut s| s.add_postings(&record.url, &counts)) {
        Ok(written) => outcome.postings_written = Some(written),
        Err(e) => tracing::warn!("Failed to write postings for {}: {}", record.url, e),
    }

    tracing::debug!("Indexed {} ({} terms)", record.url, counts.len());
    outcome
}
