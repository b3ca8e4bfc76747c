use serde::Deserialize;

/// Main configuration structure for Ripple-Frontier
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub quality: Vec<QualityEntry>,
    #[serde(default)]
    pub blacklist: Vec<DomainEntry>,
    #[serde(default)]
    pub stub: Vec<DomainEntry>,
}

/// Scheduler and runner tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    /// Maximum number of concurrent executions (1 runs single-threaded)
    pub max_in_flight: usize,

    /// Maximum number of route continuations followed for one task
    pub max_hops: u32,

    /// Retries promoted back into the frontier per scheduling tick
    pub retry_drain_batch: usize,

    /// Frontier entries examined per scheduling tick
    pub frontier_scan_batch: usize,

    /// Upper bound of a single park (milliseconds)
    pub max_park_ms: u64,

    /// Park used when the frontier is momentarily exhausted (milliseconds)
    pub idle_park_ms: u64,

    /// Upper bound of one wait for a worker completion (milliseconds)
    pub completion_wait_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 8,
            max_hops: 8,
            retry_drain_batch: 128,
            frontier_scan_batch: 128,
            max_park_ms: 1000,
            idle_park_ms: 10,
            completion_wait_ms: 50,
        }
    }
}

/// Backoff strategy for failed tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffStrategy {
    Linear,
    Exponential,
}

/// Retry behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RetryConfig {
    /// Failures tolerated before a task is dead-lettered
    pub max_attempts: u32,

    /// Base backoff delay (milliseconds)
    pub base_delay_ms: u64,

    pub strategy: BackoffStrategy,

    /// Growth factor for exponential backoff
    pub multiplier: f64,

    /// Cap for exponential backoff (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 3000,
            strategy: BackoffStrategy::Linear,
            multiplier: 2.0,
            max_delay_ms: 60_000,
        }
    }
}

/// Per-host politeness configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PolitenessConfig {
    /// Minimum time between two requests to the same host (milliseconds)
    pub minimum_delay_ms: u64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            minimum_delay_ms: 1000,
        }
    }
}

/// Crawl scope configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScopeConfig {
    /// Maximum depth to crawl from seed URLs
    pub max_depth: u32,

    /// Whether hosts outside the quality list may be crawled
    pub follow_external: bool,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            follow_external: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
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

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the markdown run report
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

/// Quality domain entry with seed URLs
#[derive(Debug, Clone, Deserialize)]
pub struct QualityEntry {
    /// Domain pattern (e.g., "example.com" or "*.example.com")
    pub domain: String,

    /// List of seed URLs to start crawling from
    pub seeds: Vec<String>,
}

/// Simple domain entry for blacklist and stub lists
#[derive(Debug, Clone, Deserialize)]
pub struct DomainEntry {
    /// Domain pattern (e.g., "example.com" or "*.example.com")
    pub domain: String,
}
