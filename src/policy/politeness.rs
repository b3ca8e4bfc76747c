//! Per-host request pacing

use crate::url::host_key;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use url::Url;

/// Gate consulted by the scheduler before a task is handed out
pub trait PolitenessPolicy: Send + Sync {
    /// Returns `None` if `url` may be requested at `now`, otherwise the
    /// earliest instant it may be requested
    ///
    /// A `None` answer counts as a request to the host.
    fn not_before(&self, url: &Url, now: Instant) -> Option<Instant>;

    /// Pushes the host's next slot out to `until`, e.g. after HTTP 429
    fn throttle(&self, _url: &Url, _until: Instant) {}
}

/// No pacing at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPoliteness;

impl PolitenessPolicy for NoPoliteness {
    fn not_before(&self, _url: &Url, _now: Instant) -> Option<Instant> {
        None
    }
}

/// Tracks the pacing state of a single host
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of requests granted to this host
    pub request_count: u32,

    /// When the last request was granted
    pub last_request_time: Option<Instant>,

    /// Explicit back-off set by [`PolitenessPolicy::throttle`]
    pub throttled_until: Option<Instant>,
}

impl HostState {
    /// Earliest instant the next request may be made
    pub fn next_allowed(&self, delay: Duration) -> Option<Instant> {
        let paced = self.last_request_time.map(|last| last + delay);
        match (paced, self.throttled_until) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Records that a request was granted at `now`
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }
}

/// Enforces a minimum delay between requests to the same host
///
/// The check-and-reserve happens under the host's map entry lock, so two
/// workers can never both be granted the same slot.
#[derive(Debug)]
pub struct HostPoliteness {
    delay: Duration,
    hosts: DashMap<String, HostState>,
}

impl HostPoliteness {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            hosts: DashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns a snapshot of a host's state
    pub fn host_state(&self, host: &str) -> Option<HostState> {
        self.hosts.get(host).map(|s| s.clone())
    }
}

impl PolitenessPolicy for HostPoliteness {
    fn not_before(&self, url: &Url, now: Instant) -> Option<Instant> {
        let mut state = self.hosts.entry(host_key(url)).or_default();

        if let Some(ready) = state.next_allowed(self.delay) {
            if ready > now {
                tracing::trace!("Host {} not ready for {:?}", host_key(url), ready - now);
                return Some(ready);
            }
        }

        state.record_request(now);
        None
    }

    fn throttle(&self, url: &Url, until: Instant) {
        let mut state = self.hosts.entry(host_key(url)).or_default();
        if state.throttled_until.map_or(true, |t| t < until) {
            state.throttled_until = Some(until);
        }
    }
}
