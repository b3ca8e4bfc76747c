//! Ripple-Frontier: a polite crawl scheduling and execution engine
//!
//! This crate decides, at every tick, which discovered unit of crawl work runs
//! next. It enforces per-host politeness delays, retries failed work with
//! backoff and shelves work that cannot succeed into a dead-letter queue.
//!
//! Network I/O, document parsing and pipeline lookup are pluggable
//! collaborators (see [`fetch`] and [`pipeline`]).

pub mod clock;
pub mod config;
pub mod crawler;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod queue;
pub mod url;

use std::sync::Arc;
use thiserror::Error;

/// Main error type for Ripple-Frontier operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Fetch failed for {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Missing service: {0}")]
    MissingService(&'static str),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Invalid setup: {0}")]
    InvalidSetup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// An error captured from a pipeline, shared between the retry buffer,
/// dispositions and dead letters.
pub type SharedError = Arc<anyhow::Error>;

/// Result type alias for Ripple-Frontier operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use crawler::{
    DecisionLog, ExecutionEngine, ProcessingContext, RunContext, Runner, ScheduleDecision,
    Scheduler, Task, TaskDisposition,
};
pub use output::RunSummary;
pub use crate::url::{classify_domain, extract_domain, normalize_url, DomainClassification};
