//! Deduplicating two-tier crawl frontier
//!
//! This module handles:
//! - URL normalization and the seen set that makes every URL enqueue once
//! - First-seen-per-domain promotion to the high priority tier
//! - FIFO dequeue that drains the high tier before the low tier
//! - Snapshot and restore for resuming a crawl

use crate::storage::{FrontierSnapshot, Tier};
use crate::url::{domain_of, extract_domain, normalize_url};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// A URL taken from the frontier together with the tier it was queued in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub tier: Tier,
}

#[derive(Debug, Default)]
struct FrontierInner {
    seen: HashSet<String>,
    known_domains: HashSet<String>,
    high: VecDeque<String>,
    low: VecDeque<String>,
}

/// Frontier shared by all fetch workers
///
/// Every operation takes one lock for its whole duration, so the seen check,
/// the insert and the tier push are atomic with respect to concurrent dequeues.
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a frontier from a saved snapshot
    ///
    /// Known domains are derived from the seen set, so a domain that was ever
    /// enqueued never gets a second high-priority slot.
    pub fn restore(snapshot: &FrontierSnapshot) -> Self {
        let mut inner = FrontierInner::default();

        for url in snapshot
            .seen
            .iter()
            .chain(snapshot.high.iter())
            .chain(snapshot.low.iter())
        {
            if inner.seen.insert(url.clone()) {
                if let Some(domain) = domain_of(url) {
                    inner.known_domains.insert(domain);
                }
            }
        }

        inner.high = snapshot.high.iter().cloned().collect();
        inner.low = snapshot.low.iter().cloned().collect();

        Self {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        // No operation leaves the queues half-updated, so a poisoned lock is usable
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Normalizes and enqueues `urls`, returning how many were new
    ///
    /// URLs already seen and URLs that fail normalization are skipped.
    pub fn enqueue<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inner = self.lock();
        let mut added = 0;

        for raw in urls {
            let Ok(url) = normalize_url(raw.as_ref()) else {
                continue;
            };
            let Some(domain) = extract_domain(&url) else {
                continue;
            };
            let url = String::from(url);

            if !inner.seen.insert(url.clone()) {
                continue;
            }

            if inner.known_domains.insert(domain) {
                inner.high.push_back(url);
            } else {
                inner.low.push_back(url);
            }
            added += 1;
        }

        added
    }

    /// Pops up to `count` entries, high tier first
    ///
    /// An empty result means no work right now, not an error.
    pub fn dequeue(&self, count: usize) -> Vec<FrontierEntry> {
        let mut inner = self.lock();
        let mut batch = Vec::with_capacity(count.min(inner.high.len() + inner.low.len()));

        while batch.len() < count {
            if let Some(url) = inner.high.pop_front() {
                batch.push(FrontierEntry {
                    url,
                    tier: Tier::High,
                });
            } else if let Some(url) = inner.low.pop_front() {
                batch.push(FrontierEntry {
                    url,
                    tier: Tier::Low,
                });
            } else {
                break;
            }
        }

        batch
    }

    /// Number of queued URLs in each tier, `(high, low)`
    pub fn queued(&self) -> (usize, usize) {
        let inner = self.lock();
        (inner.high.len(), inner.low.len())
    }

    /// Number of URLs ever enqueued
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    pub fn is_seen(&self, url: &str) -> bool {
        match normalize_url(url) {
            Ok(normalized) => self.lock().seen.contains(normalized.as_str()),
            Err(_) => false,
        }
    }

    /// Copies the queues and the seen set; robots entries are left empty
    pub fn snapshot(&self) -> FrontierSnapshot {
        let inner = self.lock();
        FrontierSnapshot {
            high: inner.high.iter().cloned().collect(),
            low: inner.low.iter().cloned().collect(),
            seen: inner.seen.iter().cloned().collect(),
            robots: Vec::new(),
        }
    }
}
