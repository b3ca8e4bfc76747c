//! Terminal sink for tasks that cannot succeed

use crate::SharedError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Instant;
use url::Url;

/// Diagnostic record of an unrecoverable failure
#[derive(Debug, Clone)]
pub struct DeadLetterItem {
    pub url: Url,
    /// Engine clock time of the failure
    pub failed_at: Instant,
    /// Wall-clock time the item was recorded
    pub recorded_at: DateTime<Utc>,
    pub reason: String,
    pub stage_id: Option<String>,
    pub route_id: Option<String>,
    pub attempt: u32,
    pub error: Option<SharedError>,
}

/// Append-only store of dead letters
#[derive(Debug, Default)]
pub struct DeadLetterQueue {
    items: Mutex<Vec<DeadLetterItem>>,
}

impl DeadLetterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: DeadLetterItem) {
        tracing::warn!(
            "Dead letter for {} after {} attempt(s): {}{}",
            item.url,
            item.attempt,
            item.reason,
            item.error
                .as_ref()
                .map(|e| format!(" ({})", e))
                .unwrap_or_default()
        );
        self.items.lock().push(item);
    }

    /// Returns a copy of every recorded item, oldest first
    pub fn items(&self) -> Vec<DeadLetterItem> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_push_preserves_diagnostics() {
        let queue = DeadLetterQueue::new();
        assert!(queue.is_empty());

        queue.push(DeadLetterItem {
            url: Url::parse("https://example.com/broken").unwrap(),
            failed_at: Instant::now(),
            recorded_at: Utc::now(),
            reason: "max attempts reached".to_string(),
            stage_id: Some("fetch".to_string()),
            route_id: Some("page".to_string()),
            attempt: 3,
            error: Some(Arc::new(anyhow::anyhow!("HTTP 503"))),
        });

        let items = queue.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].stage_id.as_deref(), Some("fetch"));
        assert_eq!(items[0].route_id.as_deref(), Some("page"));
        assert_eq!(items[0].attempt, 3);
        assert_eq!(items[0].error.as_ref().unwrap().to_string(), "HTTP 503");
    }
}
