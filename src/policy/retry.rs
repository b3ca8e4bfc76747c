//! Retry decisions for failed tasks

use crate::config::{BackoffStrategy, RetryConfig};
use crate::crawler::Task;
use crate::CrawlError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What to do with a task whose pipeline failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run again, but not before `not_before`
    Retry { not_before: Instant, reason: String },

    /// Drop the task without recording it as a failure
    Discard { reason: String },

    /// Give up and record the failure
    DeadLetter { reason: String },
}

/// Decides the fate of a failed task
///
/// Implementations are pure: they look at the task and the error and return
/// a decision, without touching any queue.
pub trait RetryPolicy: Send + Sync {
    fn on_failure(&self, task: &Task, error: &anyhow::Error, now: Instant) -> RetryDecision;
}

/// Attempt-count policy with linear backoff
///
/// `delay = base_delay * (attempt + 1)`; with `max_attempts = 3` and a 3s
/// base the delays are 3s, 6s, 9s, and the fourth failure is dead-lettered.
#[derive(Debug, Clone)]
pub struct SimpleRetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl SimpleRetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }
}

impl RetryPolicy for SimpleRetryPolicy {
    fn on_failure(&self, task: &Task, error: &anyhow::Error, now: Instant) -> RetryDecision {
        if task.attempt() >= self.max_attempts {
            return RetryDecision::DeadLetter {
                reason: "max attempts reached".to_string(),
            };
        }

        let delay = self.base_delay * (task.attempt() + 1);
        RetryDecision::Retry {
            not_before: now + delay,
            reason: format!(
                "attempt {}/{} failed, retrying in {:?}: {}",
                task.attempt() + 1,
                self.max_attempts,
                delay,
                error
            ),
        }
    }
}

/// Attempt-count policy with capped exponential backoff
///
/// `delay = min(base_delay * multiplier^attempt, max_delay)`. Responses that
/// say the resource is gone (HTTP 404/410) are discarded instead of retried.
#[derive(Debug, Clone)]
pub struct ExponentialRetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl ExponentialRetryPolicy {
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

impl RetryPolicy for ExponentialRetryPolicy {
    fn on_failure(&self, task: &Task, error: &anyhow::Error, now: Instant) -> RetryDecision {
        if let Some(CrawlError::HttpStatus { status, .. }) = error.downcast_ref::<CrawlError>() {
            if matches!(status, 404 | 410) {
                return RetryDecision::Discard {
                    reason: format!("gone (HTTP {})", status),
                };
            }
        }

        if task.attempt() >= self.max_attempts {
            return RetryDecision::DeadLetter {
                reason: "max attempts reached".to_string(),
            };
        }

        let delay = self.next_delay(task.attempt());
        RetryDecision::Retry {
            not_before: now + delay,
            reason: format!(
                "attempt {}/{} failed, retrying in {:?}: {}",
                task.attempt() + 1,
                self.max_attempts,
                delay,
                error
            ),
        }
    }
}

/// Builds the retry policy described by a configuration
pub fn retry_policy_from_config(config: &RetryConfig) -> Arc<dyn RetryPolicy> {
    let base_delay = Duration::from_millis(config.base_delay_ms);
    match config.strategy {
        BackoffStrategy::Linear => Arc::new(SimpleRetryPolicy::new(config.max_attempts, base_delay)),
        BackoffStrategy::Exponential => Arc::new(ExponentialRetryPolicy {
            max_attempts: config.max_attempts,
            base_delay,
            multiplier: config.multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }),
    }
}
