//! Two-phase URL deduplication

use dashmap::DashSet;
use url::Url;

/// Tracks which URLs were discovered and which were processed
///
/// Both sets only grow for the lifetime of a run.
pub trait SeenStore: Send + Sync {
    /// Records a discovery; returns true the first time a URL is seen
    fn mark_discovered(&self, url: &Url) -> bool;

    fn is_processed(&self, url: &Url) -> bool;

    fn mark_processed(&self, url: &Url);

    fn discovered_count(&self) -> usize;

    fn processed_count(&self) -> usize;
}

/// In-memory seen store backed by concurrent sets
#[derive(Debug, Default)]
pub struct InMemorySeenStore {
    discovered: DashSet<String>,
    processed: DashSet<String>,
}

impl InMemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeenStore for InMemorySeenStore {
    fn mark_discovered(&self, url: &Url) -> bool {
        self.discovered.insert(url.as_str().to_string())
    }

    fn is_processed(&self, url: &Url) -> bool {
        self.processed.contains(url.as_str())
    }

    fn mark_processed(&self, url: &Url) {
        self.processed.insert(url.as_str().to_string());
    }

    fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    fn processed_count(&self) -> usize {
        self.processed.len()
    }
}
