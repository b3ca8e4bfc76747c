//! Per-run ownership of queues, stores and policies

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::crawler::context::{Decision, DecisionCode, DecisionLog};
use crate::crawler::Task;
use crate::policy::{
    retry_policy_from_config, DomainScope, HostPoliteness, PolitenessPolicy, RetryPolicy,
    ScopePolicy,
};
use crate::queue::{
    DeadLetterQueue, FifoFrontier, Frontier, InMemorySeenStore, RetryBuffer, SeenStore,
};
use crate::url::{normalize_url, DomainRules};
use crate::CrawlError;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Typed lookup of shared collaborators
///
/// Stages find the fetcher, parser registry or any host-provided utility
/// here by type, e.g. `services.get::<Arc<dyn Fetcher>>()`.
#[derive(Default)]
pub struct Services {
    entries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a value, replacing any previous value of the same type
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.entries.insert(TypeId::of::<T>(), Box::new(value));
        self
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<T>())
    }

    /// Like [`Services::get`] but fails with [`CrawlError::MissingService`]
    pub fn require<T: Any + Send + Sync>(&self) -> Result<&T, CrawlError> {
        self.get::<T>()
            .ok_or(CrawlError::MissingService(type_name::<T>()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Everything one crawl run shares between its workers
///
/// Constructed once per run through [`RunContext::builder`] and shared
/// behind an `Arc`. Every store is internally synchronized.
pub struct RunContext {
    frontier: Arc<dyn Frontier>,
    retry_buffer: RetryBuffer,
    dead_letters: DeadLetterQueue,
    seen: Arc<dyn SeenStore>,
    scope: Arc<dyn ScopePolicy>,
    politeness: Arc<dyn PolitenessPolicy>,
    retry_policy: Arc<dyn RetryPolicy>,
    clock: Arc<dyn Clock>,
    services: Services,
}

impl RunContext {
    pub fn builder() -> RunContextBuilder {
        RunContextBuilder::default()
    }

    /// Builds a run context from configuration
    ///
    /// Scope comes from the domain lists and `[scope]`, politeness from
    /// `[politeness]`, retries from `[retry]`.
    pub fn from_config(config: &Config, services: Services) -> Result<Self, CrawlError> {
        RunContext::builder()
            .scope(Arc::new(DomainScope::new(
                DomainRules::from_config(config),
                config.scope.max_depth,
                config.scope.follow_external,
            )))
            .politeness(Arc::new(HostPoliteness::new(Duration::from_millis(
                config.politeness.minimum_delay_ms,
            ))))
            .retry_policy(retry_policy_from_config(&config.retry))
            .services(services)
            .build()
    }

    pub fn frontier(&self) -> &dyn Frontier {
        self.frontier.as_ref()
    }

    pub fn retry_buffer(&self) -> &RetryBuffer {
        &self.retry_buffer
    }

    pub fn dead_letters(&self) -> &DeadLetterQueue {
        &self.dead_letters
    }

    pub fn seen(&self) -> &dyn SeenStore {
        self.seen.as_ref()
    }

    pub fn scope(&self) -> &dyn ScopePolicy {
        self.scope.as_ref()
    }

    pub fn politeness(&self) -> &dyn PolitenessPolicy {
        self.politeness.as_ref()
    }

    pub fn retry_policy(&self) -> &dyn RetryPolicy {
        self.retry_policy.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// True when neither the frontier nor the retry buffer hold work
    pub fn is_idle(&self) -> bool {
        self.frontier.is_empty() && self.retry_buffer.is_empty()
    }

    /// Enqueues seed URLs at depth 0 through the scope and dedup checks
    pub fn seed<'a>(&self, urls: impl IntoIterator<Item = &'a str>) -> DecisionLog {
        let mut log = DecisionLog::new();
        let now = self.clock.now();

        for raw in urls {
            match normalize_url(raw) {
                Ok(url) => {
                    self.admit(Task::seed(url, now), &mut log);
                }
                Err(e) => log.push(Decision::rejected(
                    DecisionCode::InvalidUrl,
                    format!("{}: {}", raw, e),
                )),
            }
        }

        tracing::info!(
            "Seeded {} of {} URL(s)",
            log.accepted_count(),
            log.entries().len()
        );
        log
    }

    /// Offers a new task into the frontier if it is in scope and unseen
    ///
    /// This is the single path by which new work enters a run.
    pub(crate) fn admit(&self, task: Task, log: &mut DecisionLog) -> bool {
        if !self.scope.is_allowed(&task) {
            let reason = self.scope.deny_reason(&task);
            tracing::debug!("Out of scope: {} ({})", task.url(), reason);
            log.push(Decision::rejected(
                DecisionCode::OutOfScope,
                format!("{}: {}", task.url(), reason),
            ));
            return false;
        }

        if !self.seen.mark_discovered(task.url()) {
            tracing::trace!("Already discovered: {}", task.url());
            log.push(Decision::rejected(
                DecisionCode::DuplicateDiscovered,
                task.url().to_string(),
            ));
            return false;
        }

        log.push(Decision::accepted(format!(
            "{} at depth {}",
            task.url(),
            task.depth()
        )));
        self.frontier.offer(task);
        true
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("frontier", &self.frontier.size())
            .field("retry_buffer", &self.retry_buffer.size())
            .field("dead_letters", &self.dead_letters.len())
            .field("services", &self.services)
            .finish()
    }
}

/// Builder for [`RunContext`]
///
/// Scope, politeness and retry policies are required; the frontier defaults
/// to FIFO, the seen store to in-memory and the clock to [`SystemClock`].
#[derive(Default)]
pub struct RunContextBuilder {
    frontier: Option<Arc<dyn Frontier>>,
    seen: Option<Arc<dyn SeenStore>>,
    scope: Option<Arc<dyn ScopePolicy>>,
    politeness: Option<Arc<dyn PolitenessPolicy>>,
    retry_policy: Option<Arc<dyn RetryPolicy>>,
    clock: Option<Arc<dyn Clock>>,
    services: Services,
}

impl RunContextBuilder {
    pub fn frontier(mut self, frontier: Arc<dyn Frontier>) -> Self {
        self.frontier = Some(frontier);
        self
    }

    pub fn seen(mut self, seen: Arc<dyn SeenStore>) -> Self {
        self.seen = Some(seen);
        self
    }

    pub fn scope(mut self, scope: Arc<dyn ScopePolicy>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn politeness(mut self, politeness: Arc<dyn PolitenessPolicy>) -> Self {
        self.politeness = Some(politeness);
        self
    }

    pub fn retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = Some(retry_policy);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    pub fn build(self) -> Result<RunContext, CrawlError> {
        let missing = |name: &str| CrawlError::InvalidSetup(format!("{} is required", name));

        Ok(RunContext {
            frontier: self
                .frontier
                .unwrap_or_else(|| Arc::new(FifoFrontier::new())),
            retry_buffer: RetryBuffer::new(),
            dead_letters: DeadLetterQueue::new(),
            seen: self
                .seen
                .unwrap_or_else(|| Arc::new(InMemorySeenStore::new())),
            scope: self.scope.ok_or_else(|| missing("scope policy"))?,
            politeness: self.politeness.ok_or_else(|| missing("politeness policy"))?,
            retry_policy: self.retry_policy.ok_or_else(|| missing("retry policy"))?,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            services: self.services,
        })
    }
}
