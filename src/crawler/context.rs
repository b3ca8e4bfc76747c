//! Per-task execution context and its audit trail

use crate::crawler::{RunContext, Task};
use crate::url::resolve_url;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Outcome code of an enqueue attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionCode {
    Accepted,
    InvalidUrl,
    OutOfScope,
    DuplicateDiscovered,
}

impl DecisionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::InvalidUrl => "INVALID_URL",
            Self::OutOfScope => "OUT_OF_SCOPE",
            Self::DuplicateDiscovered => "DUPLICATE_DISCOVERED",
        }
    }
}

impl fmt::Display for DecisionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accept/reject record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub accepted: bool,
    pub code: DecisionCode,
    pub message: String,
}

impl Decision {
    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            accepted: true,
            code: DecisionCode::Accepted,
            message: message.into(),
        }
    }

    pub fn rejected(code: DecisionCode, message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            code,
            message: message.into(),
        }
    }
}

/// Append-only record of enqueue decisions
///
/// Kept for observability and tests; the scheduler never reads it.
#[derive(Debug, Clone, Default)]
pub struct DecisionLog {
    entries: Vec<Decision>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decision: Decision) {
        self.entries.push(decision);
    }

    pub fn entries(&self) -> &[Decision] {
        &self.entries
    }

    pub fn accepted_count(&self) -> usize {
        self.entries.iter().filter(|d| d.accepted).count()
    }

    pub fn count(&self, code: DecisionCode) -> usize {
        self.entries.iter().filter(|d| d.code == code).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a pipeline sees while processing one task
///
/// Created fresh for every execution. Stages pass data to later stages
/// through typed attributes and feed new work back with [`enqueue`].
///
/// [`enqueue`]: ProcessingContext::enqueue
pub struct ProcessingContext {
    task: Task,
    run: Arc<RunContext>,
    decisions: DecisionLog,
    attributes: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    stage_id: Option<String>,
}

impl ProcessingContext {
    pub fn new(task: Task, run: Arc<RunContext>) -> Self {
        Self {
            task,
            run,
            decisions: DecisionLog::new(),
            attributes: HashMap::new(),
            stage_id: None,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn run(&self) -> &RunContext {
        &self.run
    }

    pub fn decisions(&self) -> &DecisionLog {
        &self.decisions
    }

    /// Consumes the context, returning its decision log
    pub fn into_decisions(self) -> DecisionLog {
        self.decisions
    }

    /// The stage currently running, if any
    pub fn stage_id(&self) -> Option<&str> {
        self.stage_id.as_deref()
    }

    pub(crate) fn set_stage(&mut self, stage_id: Option<&str>) {
        self.stage_id = stage_id.map(str::to_string);
    }

    /// Stores a per-task value, replacing any previous value of the same type
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.attributes.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.attributes
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Discovers a URL relative to the current task
    ///
    /// The link is resolved against the task URL and normalized, then goes
    /// through the scope policy and the discovered set. Accepted links are
    /// offered to the frontier one level deeper. Every outcome is logged.
    pub fn enqueue(&mut self, url: &str, hint: Option<&str>) -> bool {
        let resolved = match resolve_url(self.task.url(), url) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::debug!("Dropping link {} from {}: {}", url, self.task.url(), e);
                self.decisions.push(Decision::rejected(
                    DecisionCode::InvalidUrl,
                    format!("{}: {}", url, e),
                ));
                return false;
            }
        };

        let child = Task::child(
            &self.task,
            resolved,
            self.stage_id.clone(),
            hint.map(str::to_string),
            self.run.clock().now(),
        );
        self.run.admit(child, &mut self.decisions)
    }
}

impl fmt::Debug for ProcessingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingContext")
            .field("task", &self.task.url().as_str())
            .field("stage_id", &self.stage_id)
            .field("decisions", &self.decisions.entries().len())
            .finish()
    }
}
