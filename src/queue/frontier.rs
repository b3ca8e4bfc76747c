//! Queues of tasks ready to run

use crate::crawler::Task;
use crossbeam::queue::SegQueue;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A queue of tasks that are ready to run
///
/// Implementations must tolerate concurrent `offer`/`poll` from multiple
/// workers. `poll` never blocks.
pub trait Frontier: Send + Sync {
    /// Enqueues a task
    fn offer(&self, task: Task);

    /// Removes and returns the next task, if any
    fn poll(&self) -> Option<Task>;

    /// Returns the current depth
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// First-in first-out frontier backed by a lock-free queue
#[derive(Debug, Default)]
pub struct FifoFrontier {
    queue: SegQueue<Task>,
}

impl FifoFrontier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Frontier for FifoFrontier {
    fn offer(&self, task: Task) {
        self.queue.push(task);
    }

    fn poll(&self) -> Option<Task> {
        self.queue.pop()
    }

    fn size(&self) -> usize {
        self.queue.len()
    }
}

/// A task tagged with its insertion sequence for stable heap ordering
#[derive(Debug)]
struct Prioritized {
    task: Task,
    seq: u64,
}

// Lower priority values are popped first; equal priorities keep insertion order
impl Ord for Prioritized {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .task
            .priority()
            .cmp(&self.task.priority())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Prioritized {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Prioritized {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Prioritized {}

#[derive(Debug, Default)]
struct PriorityState {
    heap: BinaryHeap<Prioritized>,
    next_seq: u64,
}

/// Frontier ordered by task priority (lower values first)
#[derive(Debug, Default)]
pub struct PriorityFrontier {
    state: Mutex<PriorityState>,
}

impl PriorityFrontier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Frontier for PriorityFrontier {
    fn offer(&self, task: Task) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Prioritized { task, seq });
    }

    fn poll(&self) -> Option<Task> {
        self.state.lock().heap.pop().map(|p| p.task)
    }

    fn size(&self) -> usize {
        self.state.lock().heap.len()
    }
}
