//! Markdown report generation
//!
//! This module generates a human-readable markdown report of a run: the
//! disposition counters and every dead letter with its diagnostics.

use crate::output::RunSummary;
use crate::queue::DeadLetterItem;
use crate::CrawlError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown report to `output_path`
///
/// # Arguments
///
/// * `summary` - The run counters
/// * `dead_letters` - Every dead letter of the run
/// * `config_hash` - Hash of the configuration the run used, if known
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(CrawlError::Io)` - Failed to write the file
pub fn write_markdown_report(
    summary: &RunSummary,
    dead_letters: &[DeadLetterItem],
    config_hash: Option<&str>,
    output_path: &Path,
) -> Result<(), CrawlError> {
    let markdown = format_markdown_report(summary, dead_letters, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run report as markdown
pub fn format_markdown_report(
    summary: &RunSummary,
    dead_letters: &[DeadLetterItem],
    config_hash: Option<&str>,
) -> String {
    let mut md = String::new();

    md.push_str("# Ripple-Frontier Run Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Elapsed**: {:.2?}\n", summary.elapsed));
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push_str(&format!("- **Parks**: {}\n\n", summary.parks));

    md.push_str("## Dispositions\n\n");
    md.push_str("| Disposition | Count |\n");
    md.push_str("|-------------|-------|\n");
    md.push_str(&format!("| Completed | {} |\n", summary.completed));
    md.push_str(&format!("| Retried | {} |\n", summary.retried));
    md.push_str(&format!("| Dead-lettered | {} |\n", summary.dead_lettered));
    md.push_str(&format!("| Discarded | {} |\n", summary.discarded));
    md.push_str(&format!("| **Total** | {} |\n\n", summary.executed));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        summary.success_rate()
    ));

    if dead_letters.is_empty() {
        md.push_str("No dead letters.\n");
        return md;
    }

    let mut by_reason: BTreeMap<&str, usize> = BTreeMap::new();
    for item in dead_letters {
        *by_reason.entry(item.reason.as_str()).or_default() += 1;
    }

    md.push_str("## Dead Letters by Reason\n\n");
    md.push_str("| Reason | Count |\n");
    md.push_str("|--------|-------|\n");
    for (reason, count) in &by_reason {
        md.push_str(&format!("| {} | {} |\n", escape_cell(reason), count));
    }
    md.push('\n');

    md.push_str("## Dead Letters\n\n");
    md.push_str("| URL | Reason | Route | Stage | Attempt | Error | Recorded |\n");
    md.push_str("|-----|--------|-------|-------|---------|-------|----------|\n");
    for item in dead_letters {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            escape_cell(item.url.as_str()),
            escape_cell(&item.reason),
            escape_cell(item.route_id.as_deref().unwrap_or("-")),
            escape_cell(item.stage_id.as_deref().unwrap_or("-")),
            item.attempt,
            item.error
                .as_ref()
                .map(|e| escape_cell(&e.to_string()))
                .unwrap_or_else(|| "-".to_string()),
            item.recorded_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use url::Url;

    fn dead_letter(path: &str, reason: &str, error: Option<&str>) -> DeadLetterItem {
        DeadLetterItem {
            url: Url::parse(&format!("https://example.com{}", path)).unwrap(),
            failed_at: Instant::now(),
            recorded_at: chrono::Utc::now(),
            reason: reason.to_string(),
            stage_id: Some("fetch".to_string()),
            route_id: Some("page".to_string()),
            attempt: 3,
            error: error.map(|e| Arc::new(anyhow::anyhow!(e.to_string()))),
        }
    }

    fn create_test_summary() -> RunSummary {
        RunSummary {
            executed: 10,
            completed: 7,
            retried: 1,
            dead_lettered: 2,
            discarded: 0,
            parks: 4,
            elapsed: Duration::from_secs(12),
        }
    }

    #[test]
    fn test_report_lists_dead_letters() {
        let items = vec![
            dead_letter("/a", "max attempts reached", Some("HTTP 503 | upstream")),
            dead_letter("/b", "no route", None),
            dead_letter("/c", "max attempts reached", Some("timeout")),
        ];

        let md = format_markdown_report(&create_test_summary(), &items, Some("abc123"));

        assert!(md.contains("# Ripple-Frontier Run Report"));
        assert!(md.contains("- **Config Hash**: abc123"));
        assert!(md.contains("| Completed | 7 |"));
        assert!(md.contains("| max attempts reached | 2 |"));
        assert!(md.contains("| no route | 1 |"));
        assert!(md.contains("| https://example.com/a | max attempts reached | page | fetch | 3 | HTTP 503 \\| upstream |"));
        assert!(md.contains("| https://example.com/b | no route | page | fetch | 3 | - |"));
    }

    #[test]
    fn test_pipes_in_reason_do_not_split_cells() {
        let items = vec![dead_letter(
            "/d",
            "attempt 1/3 failed | upstream",
            Some("reset | by peer\nwhile reading"),
        )];

        let md = format_markdown_report(&create_test_summary(), &items, None);

        assert!(md.contains("| attempt 1/3 failed \\| upstream | 1 |"));
        assert!(md.contains(
            "| https://example.com/d | attempt 1/3 failed \\| upstream | page | fetch | 3 | reset \\| by peer while reading |"
        ));
    }

    #[test]
    fn test_report_without_dead_letters() {
        let md = format_markdown_report(&RunSummary::default(), &[], None);
        assert!(md.contains("No dead letters."));
        assert!(!md.contains("Config Hash"));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");

        write_markdown_report(&create_test_summary(), &[], None, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("| **Total** | 10 |"));
    }
}
