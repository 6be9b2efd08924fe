//! Storage module for persisting crawl data
//!
//! This module handles all database operations, including:
//! - pages, link records and postings written by the indexing pipeline
//! - ranks written back by the ranking job
//! - the query used by search
//! - the frontier snapshot saved on shutdown

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::DriftnetError;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage shared between workers, the indexing pipeline and the ranking job
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Opens the SQLite database at `path` and wraps it for sharing
pub fn open_storage(path: &Path) -> Result<SharedStorage, DriftnetError> {
    Ok(share(SqliteStorage::new(path)?))
}

/// Wraps a storage backend for sharing
pub fn share<S: Storage + Send + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks shared storage, mapping a poisoned lock to [`StorageError::Poisoned`]
pub fn lock(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, dyn Storage + Send + 'static>> {
    storage.lock().map_err(|_| StorageError::Poisoned)
}

/// Page metadata written by the indexing pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub description: String,
}

/// A page as stored, including its rank once the ranking job has run
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPage {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub rank: Option<f64>,
}

/// A crawled page and its ordered, cross-domain outgoing links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub url: String,
    pub outgoing: Vec<String>,
}

/// Occurrences of a lemmatized term on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub word: String,
    pub url: String,
    pub count: u64,
}

/// One search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub description: String,
    pub rank: Option<f64>,
    /// Distinct query terms found on the page
    pub match_count: u32,
    /// Sum of the counts of the matched terms
    pub total_word_count: u64,
}

/// Frontier priority tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    High,
    Low,
}

impl Tier {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Self::High),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Robots text cached for a domain at snapshot time
#[derive(Debug, Clone, PartialEq)]
pub struct RobotsEntry {
    pub domain: String,
    pub robots_txt: String,
    pub fetched_at: DateTime<Utc>,
}

/// In-memory crawl state saved on shutdown and restored on resume
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontierSnapshot {
    /// High tier, in dequeue order
    pub high: Vec<String>,
    /// Low tier, in dequeue order
    pub low: Vec<String>,
    /// Every URL ever enqueued, including the queued ones
    pub seen: Vec<String>,
    pub robots: Vec<RobotsEntry>,
}

impl FrontierSnapshot {
    pub fn is_empty(&self) -> bool {
        self.high.is_empty() && self.low.is_empty() && self.seen.is_empty() && self.robots.is_empty()
    }
}
