//! Run statistics
//!
//! A `RunSummary` is filled in by the runner as dispositions are applied.

use crate::crawler::{DispositionKind, RunContext};
use std::fmt;
use std::time::Duration;

/// Counters of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Executions whose disposition was applied
    pub executed: u64,

    /// Pipelines that finished
    pub completed: u64,

    /// Failures sent back to the retry buffer
    pub retried: u64,

    /// Tasks written to the dead-letter queue
    pub dead_lettered: u64,

    /// Tasks dropped as out of scope, duplicate or gone
    pub discarded: u64,

    /// Times the runner waited for work to become eligible
    pub parks: u64,

    /// Run duration on the run's clock
    pub elapsed: Duration,
}

impl RunSummary {
    /// Counts one applied disposition
    pub fn record(&mut self, kind: DispositionKind) {
        self.executed += 1;
        match kind {
            DispositionKind::Completed => self.completed += 1,
            DispositionKind::Retried => self.retried += 1,
            DispositionKind::DeadLettered => self.dead_lettered += 1,
            DispositionKind::Discarded => self.discarded += 1,
        }
    }

    /// Percentage of executions that completed
    pub fn success_rate(&self) -> f64 {
        if self.executed == 0 {
            0.0
        } else {
            (self.completed as f64 / self.executed as f64) * 100.0
        }
    }

    /// Executions per second of elapsed time
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.executed as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} executed ({} completed, {} retried, {} dead-lettered, {} discarded) in {:.2?}",
            self.executed,
            self.completed,
            self.retried,
            self.dead_lettered,
            self.discarded,
            self.elapsed
        )
    }
}

/// Prints a run summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The counters to display
/// * `run` - The drained run, for store sizes
pub fn print_summary(summary: &RunSummary, run: &RunContext) {
    println!("=== Run Summary ===\n");

    println!("Executions:");
    println!("  Total: {}", summary.executed);
    println!("  Completed: {}", summary.completed);
    println!("  Retried: {}", summary.retried);
    println!("  Dead-lettered: {}", summary.dead_lettered);
    println!("  Discarded: {}", summary.discarded);
    println!();

    println!("Stores:");
    println!("  URLs discovered: {}", run.seen().discovered_count());
    println!("  URLs processed: {}", run.seen().processed_count());
    println!("  Dead letters: {}", run.dead_letters().len());
    println!();

    println!(
        "Elapsed: {:.2?} ({:.2} executions/sec, {} parks)",
        summary.elapsed,
        summary.throughput(),
        summary.parks
    );
    println!(
        "Success Rate: {:.1}% ({} / {} executions completed)",
        summary.success_rate(),
        summary.completed,
        summary.executed
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_each_kind() {
        let mut summary = RunSummary::default();
        for kind in [
            DispositionKind::Completed,
            DispositionKind::Completed,
            DispositionKind::Retried,
            DispositionKind::DeadLettered,
            DispositionKind::Discarded,
        ] {
            summary.record(kind);
        }

        assert_eq!(summary.executed, 5);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.retried, 1);
        assert_eq!(summary.dead_lettered, 1);
        assert_eq!(summary.discarded, 1);
        assert!((summary.success_rate() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_summary_rates() {
        let summary = RunSummary::default();
        assert_eq!(summary.success_rate(), 0.0);
        assert_eq!(summary.throughput(), 0.0);
    }

    #[test]
    fn test_display() {
        let summary = RunSummary {
            executed: 3,
            completed: 2,
            dead_lettered: 1,
            ..RunSummary::default()
        };
        assert!(summary
            .to_string()
            .starts_with("3 executed (2 completed, 0 retried, 1 dead-lettered, 0 discarded)"));
    }
}
