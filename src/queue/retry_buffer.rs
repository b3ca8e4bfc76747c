//! Time-ordered delay queue of tasks that are not yet eligible to run

use crate::crawler::Task;
use crate::SharedError;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

/// A task waiting in the retry buffer
#[derive(Debug, Clone)]
pub struct RetryEntry {
    pub not_before: Instant,
    pub task: Task,
    pub reason: String,
    pub error: Option<SharedError>,
}

#[derive(Debug)]
struct Scheduled {
    entry: RetryEntry,
    seq: u64,
}

// Reverse ordering so BinaryHeap acts as a min-heap (earliest first)
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .entry
            .not_before
            .cmp(&self.entry.not_before)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Scheduled {}

#[derive(Debug, Default)]
struct BufferState {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

/// Delay queue ordered by `not_before` ascending
///
/// Entries with the same `not_before` come out in insertion order.
#[derive(Debug, Default)]
pub struct RetryBuffer {
    state: Mutex<BufferState>,
}

impl RetryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a task that may not run before `not_before`
    pub fn schedule(
        &self,
        task: Task,
        not_before: Instant,
        reason: impl Into<String>,
        error: Option<SharedError>,
    ) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Scheduled {
            entry: RetryEntry {
                not_before,
                task,
                reason: reason.into(),
                error,
            },
            seq,
        });
    }

    /// Removes up to `max` entries due at `now`, earliest first
    pub fn drain_ready(&self, now: Instant, max: usize) -> Vec<RetryEntry> {
        let mut state = self.state.lock();
        let mut ready = Vec::new();

        while ready.len() < max {
            match state.heap.peek() {
                Some(top) if top.entry.not_before <= now => {}
                _ => break,
            }
            if let Some(scheduled) = state.heap.pop() {
                ready.push(scheduled.entry);
            }
        }

        ready
    }

    /// Returns the earliest pending `not_before` without removing it
    pub fn peek_not_before(&self) -> Option<Instant> {
        self.state.lock().heap.peek().map(|s| s.entry.not_before)
    }

    pub fn size(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}
