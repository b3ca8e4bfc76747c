//! Drivers that run the scheduler and engine until a run drains
//!
//! Two strategies share the same contract:
//! - [`Runner::run_sequential`]: one task at a time on the calling task
//! - [`Runner::run_concurrent`]: up to `max_in_flight` executions on a
//!   tokio [`JoinSet`], with dispositions applied on the driving task

use crate::config::EngineConfig;
use crate::crawler::{
    DispositionKind, ExecutionEngine, RunContext, ScheduleDecision, Scheduler, Task,
    TaskDisposition,
};
use crate::output::RunSummary;
use crate::pipeline::RouteResolver;
use crate::CrawlError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{Id, JoinError, JoinSet};

/// How often progress is logged, in executions
const PROGRESS_INTERVAL: u64 = 100;

/// Result of one sequential tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A task ran and its disposition was applied
    Executed(DispositionKind),

    /// Nothing was eligible; the caller should wait this long
    Parked(Duration),

    /// The run has no work left
    Drained,
}

/// Drives a run to completion
pub struct Runner {
    scheduler: Scheduler,
    engine: Arc<ExecutionEngine>,
    max_in_flight: usize,
    completion_wait: Duration,
}

impl Runner {
    /// Creates a new runner around an engine
    ///
    /// # Arguments
    ///
    /// * `engine` - The engine executing tasks; its run is the one scheduled
    /// * `config` - Concurrency, batch sizes and wait bounds
    ///
    /// # Returns
    ///
    /// * `Ok(Runner)` - Successfully created runner
    /// * `Err(CrawlError::InvalidSetup)` - Zero concurrency or batch size
    pub fn new(engine: Arc<ExecutionEngine>, config: &EngineConfig) -> Result<Self, CrawlError> {
        if config.max_in_flight == 0 {
            return Err(CrawlError::InvalidSetup(
                "max in flight must be positive".to_string(),
            ));
        }

        Ok(Self {
            scheduler: Scheduler::new(Arc::clone(engine.run()), config)?,
            engine,
            max_in_flight: config.max_in_flight,
            completion_wait: Duration::from_millis(config.completion_wait_ms),
        })
    }

    /// Builds the engine and runner for a run in one go
    pub fn from_config(
        run: Arc<RunContext>,
        resolver: Arc<dyn RouteResolver>,
        config: &EngineConfig,
    ) -> Result<Self, CrawlError> {
        let engine = ExecutionEngine::new(run, resolver, config.max_hops)?;
        Self::new(Arc::new(engine), config)
    }

    pub fn run_context(&self) -> &Arc<RunContext> {
        self.engine.run()
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Runs with the configured concurrency
    ///
    /// One in flight means the sequential strategy, anything more the
    /// bounded-concurrency one.
    pub async fn run(&self) -> RunSummary {
        if self.max_in_flight == 1 {
            self.run_sequential().await
        } else {
            self.run_concurrent(self.max_in_flight).await
        }
    }

    /// One scheduling step: promote retries, poll, execute, apply
    pub async fn tick(&self) -> TickOutcome {
        match self.scheduler.next_decision() {
            ScheduleDecision::TaskReady(task) => {
                let clock = self.run_context().clock();
                let disposition = self.engine.execute(&task, clock.now()).await;
                TickOutcome::Executed(self.engine.apply(&task, disposition, clock.now()))
            }
            ScheduleDecision::Park { duration, .. } => TickOutcome::Parked(duration),
            ScheduleDecision::Drained => TickOutcome::Drained,
        }
    }

    /// Runs one task at a time until the run drains
    pub async fn run_sequential(&self) -> RunSummary {
        let started = self.run_context().clock().now();
        let mut summary = RunSummary::default();
        tracing::info!("Starting sequential run");

        loop {
            match self.tick().await {
                TickOutcome::Executed(kind) => {
                    summary.record(kind);
                    self.log_progress(&summary);
                }
                TickOutcome::Parked(duration) => {
                    summary.parks += 1;
                    tokio::time::sleep(duration).await;
                }
                TickOutcome::Drained => break,
            }
        }

        summary.elapsed = self
            .run_context()
            .clock()
            .now()
            .saturating_duration_since(started);
        tracing::info!("Run drained: {}", summary);
        summary
    }

    /// Runs up to `max_in_flight` tasks at once until the run drains
    ///
    /// Dispositions are applied here, one at a time, as executions complete.
    /// When nothing can be submitted and nothing has completed, the loop
    /// waits for the next completion, bounded by the completion wait.
    pub async fn run_concurrent(&self, max_in_flight: usize) -> RunSummary {
        let max_in_flight = max_in_flight.max(1);
        let started = self.run_context().clock().now();
        let mut summary = RunSummary::default();
        let mut workers: JoinSet<TaskDisposition> = JoinSet::new();
        let mut in_flight: HashMap<Id, Task> = HashMap::new();
        tracing::info!("Starting concurrent run with up to {} in flight", max_in_flight);

        loop {
            let mut submitted = 0;
            let mut park = None;

            while workers.len() < max_in_flight {
                match self.scheduler.next_decision() {
                    ScheduleDecision::TaskReady(task) => {
                        let engine = Arc::clone(&self.engine);
                        let now = self.run_context().clock().now();
                        let worker = task.clone();
                        let handle =
                            workers.spawn(async move { engine.execute(&worker, now).await });
                        in_flight.insert(handle.id(), task);
                        submitted += 1;
                    }
                    ScheduleDecision::Park { duration, .. } => {
                        park = Some(duration);
                        break;
                    }
                    ScheduleDecision::Drained => break,
                }
            }

            let mut completed = 0;
            while let Some(joined) = workers.try_join_next_with_id() {
                self.settle(joined, &mut in_flight, &mut summary);
                completed += 1;
            }

            if workers.is_empty() && self.run_context().is_idle() {
                break;
            }

            if submitted == 0 && completed == 0 {
                if workers.is_empty() {
                    summary.parks += 1;
                    tokio::time::sleep(park.unwrap_or(Duration::ZERO)).await;
                } else {
                    let wait = park.map_or(self.completion_wait, |p| p.min(self.completion_wait));
                    if let Ok(Some(joined)) =
                        tokio::time::timeout(wait, workers.join_next_with_id()).await
                    {
                        self.settle(joined, &mut in_flight, &mut summary);
                    }
                }
            }
        }

        summary.elapsed = self
            .run_context()
            .clock()
            .now()
            .saturating_duration_since(started);
        tracing::info!("Run drained: {}", summary);
        summary
    }

    /// Applies the disposition of a finished worker
    ///
    /// A worker that died without a disposition dead-letters its task, so
    /// every submitted task is accounted for exactly once.
    fn settle(
        &self,
        joined: Result<(Id, TaskDisposition), JoinError>,
        in_flight: &mut HashMap<Id, Task>,
        summary: &mut RunSummary,
    ) {
        let (id, disposition) = match joined {
            Ok((id, disposition)) => (id, disposition),
            Err(e) => {
                tracing::error!("Worker task failed: {}", e);
                (e.id(), TaskDisposition::panicked(e.to_string(), None, None))
            }
        };

        let Some(task) = in_flight.remove(&id) else {
            tracing::error!("Finished worker {} has no task on record", id);
            return;
        };

        let now = self.run_context().clock().now();
        summary.record(self.engine.apply(&task, disposition, now));
        self.log_progress(summary);
    }

    fn log_progress(&self, summary: &RunSummary) {
        if summary.executed % PROGRESS_INTERVAL == 0 {
            let run = self.run_context();
            tracing::info!(
                "Progress: {} executed, {} in frontier, {} awaiting retry, {} dead",
                summary.executed,
                run.frontier().size(),
                run.retry_buffer().size(),
                run.dead_letters().len()
            );
        }
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("scheduler", &self.scheduler)
            .field("max_in_flight", &self.max_in_flight)
            .field("completion_wait", &self.completion_wait)
            .finish()
    }
}
