//! Robots.txt handling module
//!
//! Fetches robots.txt once per domain and turns every failure into a
//! permissive ruleset, so an unreachable robots.txt never blocks the crawl.

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::{ParsedRobots, MAX_CRAWL_DELAY};

use crate::url::robots_url;
use reqwest::Client;
use url::Url;

/// Fetches and parses the robots.txt governing `url`
///
/// # Arguments
///
/// * `client` - HTTP client carrying the crawler's user agent
/// * `url` - Any URL on the domain; only its scheme, host and port are used
///
/// # Returns
///
/// The parsed rules. Network errors, non-success statuses and unreadable
/// bodies all yield [`ParsedRobots::allow_all`].
pub async fn fetch_robots(client: &Client, url: &Url) -> ParsedRobots {
    let Some(location) = robots_url(url) else {
        return ParsedRobots::allow_all();
    };

    let response = match client.get(location.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("robots.txt fetch failed for {}: {}", location, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!(
            "robots.txt at {} returned {}, allowing all",
            location,
            response.status()
        );
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::warn!("Failed to read robots.txt body from {}: {}", location, e);
            ParsedRobots::allow_all()
        }
    }
}
