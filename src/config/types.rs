use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Driftnet
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    pub autoscale: AutoscaleConfig,
    pub output: OutputConfig,
}

/// Fetch worker behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URLs enqueued when no saved frontier is resumed
    pub seeds: Vec<String>,

    /// URLs a single worker dequeues and fetches concurrently
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Total timeout for one page request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Per-domain delay used when robots.txt names no crawl delay (milliseconds)
    #[serde(rename = "default-crawl-delay-ms", default = "default_crawl_delay_ms")]
    pub default_crawl_delay_ms: u64,

    /// How long an idle worker waits before polling the frontier again (milliseconds)
    #[serde(rename = "idle-backoff-ms", default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn default_crawl_delay(&self) -> Duration {
        Duration::from_millis(self.default_crawl_delay_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

/// Bounded retry for transient fetch failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(rename = "base-backoff-ms", default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also the robots.txt product token
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Indexing pipeline sizing
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    /// Capacity of the page record intake; producers wait when it is full
    #[serde(rename = "intake-capacity", default = "default_intake_capacity")]
    pub intake_capacity: usize,

    /// Records indexed concurrently
    #[serde(rename = "max-concurrent", default = "default_index_concurrency")]
    pub max_concurrent: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            intake_capacity: default_intake_capacity(),
            max_concurrent: default_index_concurrency(),
        }
    }
}

/// PageRank batch job parameters
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_damping")]
    pub damping: f64,

    #[serde(rename = "max-iterations", default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Rank updates written per storage round-trip
    #[serde(rename = "write-chunk-size", default = "default_write_chunk_size")]
    pub write_chunk_size: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            write_chunk_size: default_write_chunk_size(),
        }
    }
}

/// Worker pool control loop
#[derive(Debug, Clone, Deserialize)]
pub struct AutoscaleConfig {
    #[serde(rename = "min-workers")]
    pub min_workers: usize,

    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Desired completed requests per second across the pool
    #[serde(rename = "target-rate")]
    pub target_rate: f64,

    #[serde(rename = "interval-ms", default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Relative half-width of the no-action band around the target
    #[serde(default = "default_band")]
    pub band: f64,
}

impl AutoscaleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_crawl_delay_ms() -> u64 {
    2_000
}

fn default_idle_backoff_ms() -> u64 {
    50
}

fn default_max_attempts() -> u32 {
    1
}

fn default_base_backoff_ms() -> u64 {
    250
}

fn default_intake_capacity() -> usize {
    1_024
}

fn default_index_concurrency() -> usize {
    8
}

fn default_damping() -> f64 {
    0.85
}

fn default_max_iterations() -> u32 {
    100
}

fn default_tolerance() -> f64 {
    1.0e-6
}

fn default_write_chunk_size() -> usize {
    5_000
}

fn default_interval_ms() -> u64 {
    5_000
}

fn default_band() -> f64 {
    0.2
}
