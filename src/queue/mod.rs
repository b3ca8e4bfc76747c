//! Work stores shared by every worker of a run
//!
//! # Components
//!
//! - `Frontier`: tasks ready to run (FIFO baseline, priority upgrade)
//! - `RetryBuffer`: tasks waiting for a `not_before` instant
//! - `DeadLetterQueue`: tasks that failed for good
//! - `SeenStore`: discovered/processed URL sets
//!
//! All of them are internally synchronized and safe to share behind an `Arc`.

mod dead_letter;
mod frontier;
mod retry_buffer;
mod seen;

pub use dead_letter::{DeadLetterItem, DeadLetterQueue};
pub use frontier::{FifoFrontier, Frontier, PriorityFrontier};
pub use retry_buffer::{RetryBuffer, RetryEntry};
pub use seen::{InMemorySeenStore, SeenStore};
