//! The crawl scheduling and execution core
//!
//! This module contains:
//! - `Task`: the immutable unit of work
//! - `RunContext`: per-run ownership of stores, policies and services
//! - `ProcessingContext`: what a pipeline sees while running one task
//! - `Scheduler`: picks the next eligible task under politeness
//! - `ExecutionEngine`: runs pipelines and turns outcomes into dispositions
//! - `Runner`: drives scheduler and engine until the run drains

mod context;
mod engine;
mod run_context;
mod runner;
mod scheduler;
mod task;

pub use context::{Decision, DecisionCode, DecisionLog, ProcessingContext};
pub use engine::{DispositionKind, ExecutionEngine, TaskDisposition};
pub use run_context::{RunContext, RunContextBuilder, Services};
pub use runner::{Runner, TickOutcome};
pub use scheduler::{ScheduleDecision, Scheduler};
pub use task::Task;
