//! Robots.txt cache entry
//!
//! Entries are kept for the life of a crawl run. The fetch time is persisted
//! with the frontier snapshot so a resumed run can discard old rules.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};

/// Cached robots.txt data for a domain
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    /// Creates a cache entry stamped with the current time
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Rebuilds an entry restored from storage
    pub fn restored(content: ParsedRobots, fetched_at: DateTime<Utc>) -> Self {
        Self {
            content,
            fetched_at,
        }
    }

    /// Checks if the entry is older than 24 hours
    ///
    /// # Returns
    ///
    /// `true` when the rules should be fetched again instead of restored
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::hours(24)
    }

    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        self.content.is_allowed(url, agent)
    }

    pub fn crawl_delay(&self, agent: &str) -> Option<std::time::Duration> {
        self.content.crawl_delay(agent)
    }
}
