//! The immutable unit of crawl work

use crate::url::host_key;
use std::time::Instant;
use url::Url;

/// A URL scheduled for processing
///
/// Tasks are never mutated in place; retry scheduling and politeness
/// rescheduling produce copies through [`Task::with_attempt`] and
/// [`Task::with_schedule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    url: Url,
    depth: u32,
    parent: Option<Url>,
    discovered_by: Option<String>,
    priority: i32,
    scheduled_at: Instant,
    attempt: u32,
    hint: Option<String>,
}

impl Task {
    /// Creates a depth-0 task with no parent
    pub fn seed(url: Url, now: Instant) -> Self {
        Self {
            url,
            depth: 0,
            parent: None,
            discovered_by: None,
            priority: 0,
            scheduled_at: now,
            attempt: 0,
            hint: None,
        }
    }

    /// Creates a task discovered while processing `parent`
    ///
    /// The child sits one level deeper, starts at attempt 0 and inherits the
    /// parent's priority.
    pub fn child(
        parent: &Task,
        url: Url,
        discovered_by: Option<String>,
        hint: Option<String>,
        now: Instant,
    ) -> Self {
        Self {
            url,
            depth: parent.depth + 1,
            parent: Some(parent.url.clone()),
            discovered_by,
            priority: parent.priority,
            scheduled_at: now,
            attempt: 0,
            hint,
        }
    }

    /// Returns a copy with a different priority (lower runs first)
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Returns a copy with a routing hint attached
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Returns a copy for the next attempt, scheduled at `now`
    pub fn with_attempt(&self, now: Instant) -> Self {
        Self {
            attempt: self.attempt + 1,
            scheduled_at: now,
            ..self.clone()
        }
    }

    /// Returns a copy scheduled at `at`, attempt unchanged
    pub fn with_schedule(&self, at: Instant) -> Self {
        Self {
            scheduled_at: at,
            ..self.clone()
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn parent(&self) -> Option<&Url> {
        self.parent.as_ref()
    }

    /// The stage or component that discovered this task
    pub fn discovered_by(&self) -> Option<&str> {
        self.discovered_by.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn scheduled_at(&self) -> Instant {
        self.scheduled_at
    }

    /// Number of failed attempts so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Free-form routing hint consulted by route resolvers
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Politeness key of this task's URL
    pub fn host(&self) -> String {
        host_key(&self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn seed(path: &str) -> Task {
        let url = Url::parse(&format!("https://example.com{}", path)).unwrap();
        Task::seed(url, Instant::now())
    }

    #[test]
    fn test_seed_task() {
        let task = seed("/");
        assert_eq!(task.depth(), 0);
        assert_eq!(task.attempt(), 0);
        assert!(task.parent().is_none());
        assert_eq!(task.host(), "example.com");
    }

    #[test]
    fn test_child_task() {
        let parent = seed("/").with_priority(4);
        let url = Url::parse("https://example.com/child").unwrap();
        let child = Task::child(
            &parent,
            url,
            Some("follow-links".to_string()),
            Some("article".to_string()),
            Instant::now(),
        );

        assert_eq!(child.depth(), 1);
        assert_eq!(child.attempt(), 0);
        assert_eq!(child.priority(), 4);
        assert_eq!(child.parent(), Some(parent.url()));
        assert_eq!(child.discovered_by(), Some("follow-links"));
        assert_eq!(child.hint(), Some("article"));
    }

    #[test]
    fn test_with_attempt_copies() {
        let task = seed("/page");
        let later = task.scheduled_at() + Duration::from_secs(5);

        let retried = task.with_attempt(later);

        assert_eq!(task.attempt(), 0);
        assert_eq!(retried.attempt(), 1);
        assert_eq!(retried.scheduled_at(), later);
        assert_eq!(retried.url(), task.url());
    }

    #[test]
    fn test_with_schedule_keeps_attempt() {
        let task = seed("/page").with_attempt(Instant::now());
        let at = Instant::now() + Duration::from_secs(1);

        let moved = task.with_schedule(at);

        assert_eq!(moved.attempt(), 1);
        assert_eq!(moved.scheduled_at(), at);
    }
}
