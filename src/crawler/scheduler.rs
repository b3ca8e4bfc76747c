//! Scheduler deciding which task runs next
//!
//! Each call to [`Scheduler::next_decision`]:
//! - Promotes due retries from the retry buffer into the frontier
//! - Scans a bounded number of frontier entries through the politeness gate
//! - Reschedules gated tasks instead of waiting on them
//! - Parks or reports the run as drained when nothing is eligible

use crate::config::EngineConfig;
use crate::crawler::{RunContext, Task};
use crate::CrawlError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of one scheduling step
#[derive(Debug, Clone)]
pub enum ScheduleDecision {
    /// A task passed the politeness gate and may run now
    TaskReady(Task),

    /// Nothing is eligible yet; check again after `duration`
    Park {
        duration: Duration,
        wake_up_at: Instant,
    },

    /// Neither the frontier nor the retry buffer hold any work
    Drained,
}

/// Pulls work from the frontier and retry buffer
///
/// The scheduler holds no queue of its own: every task lives in exactly one
/// of the run's stores, and moves between them only here.
pub struct Scheduler {
    run: Arc<RunContext>,
    retry_drain_batch: usize,
    frontier_scan_batch: usize,
    max_park: Duration,
    idle_park: Duration,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `run` - The run whose stores and policies are scheduled
    /// * `config` - Batch sizes and park durations
    ///
    /// # Returns
    ///
    /// * `Ok(Scheduler)` - Successfully created scheduler
    /// * `Err(CrawlError::InvalidSetup)` - A batch size is zero
    pub fn new(run: Arc<RunContext>, config: &EngineConfig) -> Result<Self, CrawlError> {
        if config.retry_drain_batch == 0 || config.frontier_scan_batch == 0 {
            return Err(CrawlError::InvalidSetup(
                "scheduler batch sizes must be positive".to_string(),
            ));
        }

        Ok(Self {
            run,
            retry_drain_batch: config.retry_drain_batch,
            frontier_scan_batch: config.frontier_scan_batch,
            max_park: Duration::from_millis(config.max_park_ms),
            idle_park: Duration::from_millis(config.idle_park_ms),
        })
    }

    pub fn run(&self) -> &Arc<RunContext> {
        &self.run
    }

    /// Moves retries due at `now` into the frontier
    ///
    /// # Returns
    ///
    /// The number of tasks promoted
    pub fn promote_due(&self, now: Instant) -> usize {
        let ready = self.run.retry_buffer().drain_ready(now, self.retry_drain_batch);
        let promoted = ready.len();

        for entry in ready {
            tracing::trace!("Promoting {} ({})", entry.task.url(), entry.reason);
            self.run.frontier().offer(entry.task);
        }

        promoted
    }

    /// Computes the next scheduling decision
    ///
    /// A host that is not ready never blocks tasks for other hosts: its task
    /// goes back into the retry buffer with the politeness `not_before` and
    /// the scan moves on to the next frontier entry.
    pub fn next_decision(&self) -> ScheduleDecision {
        let now = self.run.clock().now();
        self.promote_due(now);

        for _ in 0..self.frontier_scan_batch {
            let task = match self.run.frontier().poll() {
                Some(task) => task,
                None => break,
            };

            match self.run.politeness().not_before(task.url(), now) {
                None => {
                    tracing::trace!("Task ready: {}", task.url());
                    return ScheduleDecision::TaskReady(task);
                }
                Some(not_before) => {
                    tracing::trace!(
                        "Politeness delays {} by {:?}",
                        task.url(),
                        not_before.saturating_duration_since(now)
                    );
                    let rescheduled = task.with_schedule(not_before);
                    self.run
                        .retry_buffer()
                        .schedule(rescheduled, not_before, "politeness", None);
                }
            }
        }

        let frontier_empty = self.run.frontier().is_empty();
        let next_retry = self.run.retry_buffer().peek_not_before();

        let duration = match (frontier_empty, next_retry) {
            (true, None) => return ScheduleDecision::Drained,
            (true, Some(not_before)) => not_before.saturating_duration_since(now).min(self.max_park),
            // Scan budget ran out with work still queued
            (false, Some(_)) => Duration::ZERO,
            // Work arrived from another worker while scanning
            (false, None) => self.idle_park,
        };

        ScheduleDecision::Park {
            duration,
            wake_up_at: now + duration,
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("retry_drain_batch", &self.retry_drain_batch)
            .field("frontier_scan_batch", &self.frontier_scan_batch)
            .field("max_park", &self.max_park)
            .field("idle_park", &self.idle_park)
            .finish()
    }
}
