//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate; the crate does
//! not expose Crawl-delay, so that directive is read here group by group.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Longest crawl delay honored; larger requests are clamped to this
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(3600);

/// Parsed robots.txt data
///
/// Holds the raw body. An empty body allows everything and names no delay,
/// which is also what a failed or missing robots.txt turns into.
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    content: String,
}

impl ParsedRobots {
    /// Creates a ruleset from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Creates a permissive ruleset that allows everything with no delay
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns the raw robots.txt content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns true when no rules were loaded
    pub fn is_permissive(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks if an absolute URL is allowed for the given product token
    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        if self.is_permissive() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, agent, url)
    }

    /// Gets the crawl delay that applies to `agent`
    ///
    /// A group naming the agent wins over the `*` group. Values are seconds and
    /// may be fractional.
    ///
    /// # Arguments
    ///
    /// * `agent` - Product token, matched case-insensitively against group names
    ///
    /// # Returns
    ///
    /// * `Some(delay)` - The first valid delay of the best matching group,
    ///   clamped to [`MAX_CRAWL_DELAY`]
    /// * `None` - No group applies, or its values are unparsable or negative
    pub fn crawl_delay(&self, agent: &str) -> Option<Duration> {
        if self.is_permissive() {
            return None;
        }

        let agent = agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut for_agent: Option<f64> = None;
        let mut for_wildcard: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after rules opens a new group
                    if in_rules {
                        group_agents.clear();
                        in_rules = false;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(seconds) = value.parse::<f64>() else {
                        continue;
                    };
                    if !seconds.is_finite() || seconds < 0.0 {
                        continue;
                    }
                    if group_agents.iter().any(|ua| *ua == agent) {
                        for_agent.get_or_insert(seconds);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        for_wildcard.get_or_insert(seconds);
                    }
                }
                _ => in_rules = true,
            }
        }

        for_agent.or(for_wildcard).map(|seconds| {
            Duration::try_from_secs_f64(seconds)
                .map_or(MAX_CRAWL_DELAY, |delay| delay.min(MAX_CRAWL_DELAY))
        })
    }
}
