//! Output module for run summaries and reports
//!
//! This module handles:
//! - Counting dispositions into a `RunSummary`
//! - Printing the summary to stdout
//! - Writing a markdown report including every dead letter

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_report, write_markdown_report};
pub use stats::{print_summary, RunSummary};
