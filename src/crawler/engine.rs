//! Task execution and disposition handling
//!
//! The engine is the only place pipeline errors are caught. Every outcome,
//! including panics, leaves [`ExecutionEngine::execute`] as a
//! [`TaskDisposition`] value; [`ExecutionEngine::apply`] then writes it to
//! the retry buffer or the dead-letter queue.

use crate::crawler::{DecisionLog, ProcessingContext, RunContext, Task};
use crate::pipeline::{PipelineFailure, PipelineResult, Route, RouteResolver};
use crate::policy::RetryDecision;
use crate::queue::DeadLetterItem;
use crate::{CrawlError, SharedError};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of executing one task
#[derive(Debug, Clone)]
pub enum TaskDisposition {
    /// The pipeline finished and the URL is marked processed
    Completed,

    /// The pipeline failed and should run again after `not_before`
    RetryLater {
        not_before: Instant,
        reason: String,
        error: SharedError,
        stage_id: Option<String>,
        route_id: Option<String>,
    },

    /// The task can never succeed
    DeadLetter {
        reason: String,
        error: Option<SharedError>,
        stage_id: Option<String>,
        route_id: Option<String>,
    },

    /// The task was dropped without being a failure
    Discarded { reason: String },
}

impl TaskDisposition {
    pub fn kind(&self) -> DispositionKind {
        match self {
            Self::Completed => DispositionKind::Completed,
            Self::RetryLater { .. } => DispositionKind::Retried,
            Self::DeadLetter { .. } => DispositionKind::DeadLettered,
            Self::Discarded { .. } => DispositionKind::Discarded,
        }
    }

    /// Dead letter for an execution that panicked
    pub(crate) fn panicked(
        message: impl Into<String>,
        stage_id: Option<String>,
        route_id: Option<String>,
    ) -> Self {
        Self::DeadLetter {
            reason: "pipeline panicked".to_string(),
            error: Some(Arc::new(anyhow::anyhow!(message.into()))),
            stage_id,
            route_id,
        }
    }
}

/// Dataless tag of a [`TaskDisposition`], used for statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispositionKind {
    Completed,
    Retried,
    DeadLettered,
    Discarded,
}

/// Runs task pipelines and interprets their outcome
pub struct ExecutionEngine {
    run: Arc<RunContext>,
    resolver: Arc<dyn RouteResolver>,
    max_hops: u32,
}

impl ExecutionEngine {
    /// Creates a new engine
    ///
    /// # Arguments
    ///
    /// * `run` - The run the engine executes tasks for
    /// * `resolver` - Maps tasks and continuation ids to routes
    /// * `max_hops` - Route continuations followed before a task is dead-lettered
    ///
    /// # Returns
    ///
    /// * `Ok(ExecutionEngine)` - Successfully created engine
    /// * `Err(CrawlError::InvalidSetup)` - `max_hops` is zero
    pub fn new(
        run: Arc<RunContext>,
        resolver: Arc<dyn RouteResolver>,
        max_hops: u32,
    ) -> Result<Self, CrawlError> {
        if max_hops == 0 {
            return Err(CrawlError::InvalidSetup(
                "max hops must be positive".to_string(),
            ));
        }

        Ok(Self {
            run,
            resolver,
            max_hops,
        })
    }

    pub fn run(&self) -> &Arc<RunContext> {
        &self.run
    }

    pub fn max_hops(&self) -> u32 {
        self.max_hops
    }

    /// Executes a task and returns what should happen to it
    ///
    /// Safe to call concurrently for independent tasks. Nothing is written
    /// to the retry buffer or dead-letter queue here; see [`apply`].
    ///
    /// [`apply`]: ExecutionEngine::apply
    pub async fn execute(&self, task: &Task, now: Instant) -> TaskDisposition {
        self.execute_traced(task, now).await.0
    }

    /// Like [`execute`](ExecutionEngine::execute), also returning the
    /// enqueue decisions the pipeline made
    ///
    /// A panic anywhere in the execution, including the scope, seen store,
    /// resolver and retry policy, becomes a `"pipeline panicked"` dead letter.
    pub async fn execute_traced(&self, task: &Task, now: Instant) -> (TaskDisposition, DecisionLog) {
        match AssertUnwindSafe(self.run_task(task, now)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("Execution of {} panicked: {}", task.url(), message);
                (
                    TaskDisposition::panicked(message, None, None),
                    DecisionLog::new(),
                )
            }
        }
    }

    async fn run_task(&self, task: &Task, now: Instant) -> (TaskDisposition, DecisionLog) {
        if !self.run.scope().is_allowed(task) {
            let reason = self.run.scope().deny_reason(task);
            tracing::debug!("Discarding out-of-scope {}: {}", task.url(), reason);
            return (TaskDisposition::Discarded { reason }, DecisionLog::new());
        }

        if self.run.seen().is_processed(task.url()) {
            tracing::debug!("Discarding already processed {}", task.url());
            return (
                TaskDisposition::Discarded {
                    reason: "duplicate".to_string(),
                },
                DecisionLog::new(),
            );
        }

        let mut route = match self.resolver.resolve(task, &self.run) {
            Some(route) => route,
            None => return (no_route(None), DecisionLog::new()),
        };

        let mut ctx = ProcessingContext::new(task.clone(), Arc::clone(&self.run));
        let mut hops = 0;

        let disposition = loop {
            tracing::debug!("Running route {} for {}", route.id(), task.url());
            let outcome = AssertUnwindSafe(route.pipeline().execute(&mut ctx))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(PipelineResult::Done)) => {
                    self.run.seen().mark_processed(task.url());
                    break TaskDisposition::Completed;
                }
                Ok(Ok(PipelineResult::Route(next))) => {
                    hops += 1;
                    if hops > self.max_hops {
                        break TaskDisposition::DeadLetter {
                            reason: "hop limit exceeded".to_string(),
                            error: Some(Arc::new(
                                CrawlError::IllegalState(format!(
                                    "more than {} route hops for {}",
                                    self.max_hops,
                                    task.url()
                                ))
                                .into(),
                            )),
                            stage_id: ctx.stage_id().map(str::to_string),
                            route_id: Some(route.id().to_string()),
                        };
                    }
                    match self.resolver.by_id(&next) {
                        Some(next_route) => {
                            tracing::trace!("Hop {} -> {} for {}", route.id(), next, task.url());
                            route = next_route;
                        }
                        None => break no_route(Some(next)),
                    }
                }
                Ok(Err(failure)) => break self.on_failure(task, failure, route.as_ref(), now),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!("Route {} panicked on {}: {}", route.id(), task.url(), message);
                    break TaskDisposition::panicked(
                        message,
                        ctx.stage_id().map(str::to_string),
                        Some(route.id().to_string()),
                    );
                }
            }
        };

        (disposition, ctx.into_decisions())
    }

    /// Asks the retry policy what a pipeline failure means for the task
    fn on_failure(
        &self,
        task: &Task,
        failure: PipelineFailure,
        route: &dyn Route,
        now: Instant,
    ) -> TaskDisposition {
        let decision = self.run.retry_policy().on_failure(task, &failure.error, now);
        let error = Arc::new(failure.error);
        let stage_id = Some(failure.stage_id);
        let route_id = Some(route.id().to_string());

        match decision {
            RetryDecision::Retry { not_before, reason } => TaskDisposition::RetryLater {
                not_before,
                reason,
                error,
                stage_id,
                route_id,
            },
            RetryDecision::Discard { reason } => TaskDisposition::Discarded { reason },
            RetryDecision::DeadLetter { reason } => TaskDisposition::DeadLetter {
                reason,
                error: Some(error),
                stage_id,
                route_id,
            },
        }
    }

    /// Writes a disposition to the run's stores
    ///
    /// Must be called exactly once per execution, and never concurrently
    /// with itself. Retry buffer and dead-letter writes happen here.
    /// Completed tasks are already marked processed by [`execute`] on the
    /// worker that ran them; the seen store is internally synchronized and
    /// `apply` only logs them.
    ///
    /// [`execute`]: ExecutionEngine::execute
    ///
    /// # Returns
    ///
    /// The kind of disposition applied
    pub fn apply(&self, task: &Task, disposition: TaskDisposition, now: Instant) -> DispositionKind {
        let kind = disposition.kind();

        match disposition {
            TaskDisposition::Completed => {
                tracing::debug!("Completed {}", task.url());
            }
            TaskDisposition::Discarded { reason } => {
                tracing::debug!("Discarded {}: {}", task.url(), reason);
            }
            TaskDisposition::RetryLater {
                not_before,
                reason,
                error,
                ..
            } => {
                tracing::debug!("Retrying {} ({})", task.url(), reason);
                self.run.retry_buffer().schedule(
                    task.with_attempt(now),
                    not_before,
                    reason,
                    Some(error),
                );
            }
            TaskDisposition::DeadLetter {
                reason,
                error,
                stage_id,
                route_id,
            } => {
                self.run.dead_letters().push(DeadLetterItem {
                    url: task.url().clone(),
                    failed_at: now,
                    recorded_at: chrono::Utc::now(),
                    reason,
                    stage_id,
                    route_id,
                    attempt: task.attempt(),
                    error,
                });
            }
        }

        kind
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("run", &self.run)
            .field("max_hops", &self.max_hops)
            .finish()
    }
}

fn no_route(route_id: Option<String>) -> TaskDisposition {
    TaskDisposition::DeadLetter {
        reason: "no route".to_string(),
        error: None,
        stage_id: None,
        route_id,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
