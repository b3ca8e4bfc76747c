//! Admissibility of tasks

use crate::crawler::Task;
use crate::url::{classify_domain, extract_domain, DomainClassification, DomainRules};

/// Decides whether a task belongs to the crawl
pub trait ScopePolicy: Send + Sync {
    fn is_allowed(&self, task: &Task) -> bool;

    /// Human-readable reason a task is denied
    fn deny_reason(&self, task: &Task) -> String;
}

/// Admits everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ScopePolicy for AllowAll {
    fn is_allowed(&self, _task: &Task) -> bool {
        true
    }

    fn deny_reason(&self, _task: &Task) -> String {
        String::new()
    }
}

/// Scope defined by domain classification and crawl depth
///
/// A task is admitted when:
/// - its scheme is http or https
/// - its depth does not exceed `max_depth`
/// - its host is neither blacklisted nor stubbed
/// - its host is a quality domain, or `follow_external` is set
#[derive(Debug, Clone)]
pub struct DomainScope {
    rules: DomainRules,
    max_depth: u32,
    follow_external: bool,
}

impl DomainScope {
    pub fn new(rules: DomainRules, max_depth: u32, follow_external: bool) -> Self {
        Self {
            rules,
            max_depth,
            follow_external,
        }
    }

    fn check(&self, task: &Task) -> Result<(), String> {
        let url = task.url();
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!("unsupported scheme '{}'", url.scheme()));
        }

        if task.depth() > self.max_depth {
            return Err(format!(
                "depth {} exceeds max depth {}",
                task.depth(),
                self.max_depth
            ));
        }

        let domain = extract_domain(url).ok_or_else(|| "missing host".to_string())?;
        match classify_domain(&domain, &self.rules) {
            DomainClassification::Blacklisted => Err(format!("{} is blacklisted", domain)),
            DomainClassification::Stubbed => Err(format!("{} is stubbed", domain)),
            DomainClassification::Quality => Ok(()),
            DomainClassification::Discovered if self.follow_external => Ok(()),
            DomainClassification::Discovered => {
                Err(format!("{} is outside the quality domains", domain))
            }
        }
    }
}

impl ScopePolicy for DomainScope {
    fn is_allowed(&self, task: &Task) -> bool {
        self.check(task).is_ok()
    }

    fn deny_reason(&self, task: &Task) -> String {
        self.check(task).err().unwrap_or_default()
    }
}
