//! Politeness gate: robots.txt rules and per-domain pacing
//!
//! Domain state lives in a sharded map so lookups for unrelated domains do not
//! contend. Each [`DomainState`] guards its own cooldown clock, and its robots
//! slot is filled by a single in-flight fetch.

use crate::robots::{fetch_robots, CachedRobots, ParsedRobots, MAX_CRAWL_DELAY};
use crate::state::DomainState;
use crate::storage::RobotsEntry;
use crate::url::extract_domain;
use dashmap::DashMap;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub struct PolitenessGate {
    domains: DashMap<String, Arc<DomainState>>,
    client: Client,
    /// robots.txt product token
    agent: String,
    /// Used when robots.txt names no crawl delay
    default_delay: Duration,
}

impl PolitenessGate {
    pub fn new(client: Client, agent: impl Into<String>, default_delay: Duration) -> Self {
        Self {
            domains: DashMap::new(),
            client,
            agent: agent.into(),
            default_delay,
        }
    }

    /// Returns the state for `domain`, creating it on first use
    pub fn domain_state(&self, domain: &str) -> Arc<DomainState> {
        if let Some(state) = self.domains.get(domain) {
            return Arc::clone(state.value());
        }
        Arc::clone(self.domains.entry(domain.to_string()).or_default().value())
    }

    /// Makes sure robots.txt for the URL's domain is cached
    ///
    /// The first caller for a domain fetches; concurrent callers wait for that
    /// fetch. Failures cache a permissive ruleset.
    pub async fn ensure_robots(&self, url: &Url) {
        let Some(domain) = extract_domain(url) else {
            return;
        };
        let state = self.domain_state(&domain);
        if state.robots().is_some() {
            return;
        }

        state
            .robots_or_fetch(|| async {
                let rules = fetch_robots(&self.client, url).await;
                tracing::debug!(
                    "Cached robots.txt for {} ({})",
                    domain,
                    if rules.is_permissive() {
                        "allow all"
                    } else {
                        "rules loaded"
                    }
                );
                CachedRobots::new(rules)
            })
            .await;
    }

    /// Checks the URL against its domain's cached rules
    ///
    /// A domain without cached rules is treated as permissive.
    pub fn can_fetch(&self, url: &Url) -> bool {
        let Some(domain) = extract_domain(url) else {
            return false;
        };
        match self.domains.get(&domain) {
            Some(state) => state
                .robots()
                .map(|robots| robots.is_allowed(url.as_str(), &self.agent))
                .unwrap_or(true),
            None => true,
        }
    }

    /// Crawl delay from the domain's cached robots.txt, if it names one
    pub fn crawl_delay(&self, domain: &str) -> Option<Duration> {
        self.domains
            .get(domain)
            .and_then(|state| state.robots().and_then(|r| r.crawl_delay(&self.agent)))
    }

    /// Reserves the next request slot for `domain` and returns the wait until it
    ///
    /// The domain's clock advances by the delay even when the wait is zero,
    /// so concurrent callers receive strictly later slots.
    ///
    /// # Arguments
    ///
    /// * `domain` - Lowercase host
    /// * `requested_delay` - Delay from robots.txt; `None` uses the configured
    ///   default. Either is capped at [`MAX_CRAWL_DELAY`]
    ///
    /// # Returns
    ///
    /// How long the caller must sleep before its request may start
    pub fn next_cooldown(&self, domain: &str, requested_delay: Option<Duration>) -> Duration {
        let delay = requested_delay
            .unwrap_or(self.default_delay)
            .min(MAX_CRAWL_DELAY);
        self.domain_state(domain).advance_cooldown(delay)
    }

    /// Number of domains with state
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    /// Cached robots bodies for the frontier snapshot
    pub fn robots_snapshot(&self) -> Vec<RobotsEntry> {
        self.domains
            .iter()
            .filter_map(|entry| {
                entry.value().robots().map(|robots| RobotsEntry {
                    domain: entry.key().clone(),
                    robots_txt: robots.content.content().to_string(),
                    fetched_at: robots.fetched_at,
                })
            })
            .collect()
    }

    /// Restores robots bodies saved by [`robots_snapshot`](Self::robots_snapshot)
    ///
    /// Entries older than a day are dropped so they are fetched again.
    /// Returns the number restored.
    pub fn restore_robots(&self, entries: &[RobotsEntry]) -> usize {
        let mut restored = 0;
        for entry in entries {
            let cached = CachedRobots::restored(
                ParsedRobots::from_content(&entry.robots_txt),
                entry.fetched_at,
            );
            if cached.is_stale() {
                continue;
            }
            if self.domain_state(&entry.domain).restore_robots(cached) {
                restored += 1;
            }
        }
        restored
    }
}
