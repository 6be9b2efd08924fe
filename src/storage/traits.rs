//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{FrontierSnapshot, LinkRecord, PageRecord, Posting, SearchHit, StoredPage};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Invalid stored value: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writers take `&mut self`; callers share one backend behind a mutex, which
/// makes concurrent upserts to the same key linearizable.
pub trait Storage {
    // ===== Index Writes =====

    /// Inserts a page or overwrites its title and description
    ///
    /// The stored rank is never touched. Returns the page id.
    fn upsert_page(&mut self, page: &PageRecord) -> StorageResult<i64>;

    /// Inserts a link record or replaces its outgoing set, in one transaction
    fn upsert_links(&mut self, links: &LinkRecord) -> StorageResult<()>;

    /// Adds `counts` to the postings of `url`
    ///
    /// Absent postings are inserted with the given count; present ones are
    /// incremented by it. Returns the number of terms written.
    fn add_postings(&mut self, url: &str, counts: &HashMap<String, u32>) -> StorageResult<usize>;

    // ===== Reads =====

    /// Gets a page by URL
    fn get_page(&self, url: &str) -> StorageResult<Option<StoredPage>>;

    /// Gets the count of one posting
    fn get_posting(&self, word: &str, url: &str) -> StorageResult<Option<u64>>;

    /// Gets all postings of a page, ordered by word
    fn get_postings(&self, url: &str) -> StorageResult<Vec<Posting>>;

    /// Loads every link record with its ordered outgoing set
    fn load_links(&self) -> StorageResult<Vec<LinkRecord>>;

    /// Loads the URL to page id lookup
    fn load_page_ids(&self) -> StorageResult<HashMap<String, i64>>;

    // ===== Ranking =====

    /// Writes ranks for the given page ids in one transaction
    ///
    /// Ids without a page are skipped. Returns the number of pages updated.
    fn update_ranks(&mut self, ranks: &[(i64, f64)]) -> StorageResult<usize>;

    // ===== Query =====

    /// Finds pages whose postings intersect `terms`
    ///
    /// With `require_all`, only pages matching every distinct term are kept.
    /// Results are ordered by rank (unset last), then total matched count.
    fn search(&self, terms: &[String], require_all: bool, limit: usize)
        -> StorageResult<Vec<SearchHit>>;

    // ===== Frontier Snapshot =====

    /// Replaces the saved frontier snapshot
    fn save_frontier(&mut self, snapshot: &FrontierSnapshot) -> StorageResult<()>;

    /// Loads the saved frontier snapshot, `None` if nothing was saved
    fn load_frontier(&self) -> StorageResult<Option<FrontierSnapshot>>;

    /// Deletes the saved frontier snapshot
    fn clear_frontier(&mut self) -> StorageResult<()>;

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<u64>;

    fn count_links(&self) -> StorageResult<u64>;

    fn count_postings(&self) -> StorageResult<u64>;
}
