//! Pluggable decision policies
//!
//! - `ScopePolicy`: is a task part of this crawl at all?
//! - `PolitenessPolicy`: may this host be requested right now?
//! - `RetryPolicy`: what happens to a task whose pipeline failed?

mod politeness;
mod retry;
mod scope;

pub use politeness::{HostPoliteness, HostState, NoPoliteness, PolitenessPolicy};
pub use retry::{
    retry_policy_from_config, ExponentialRetryPolicy, RetryDecision, RetryPolicy,
    SimpleRetryPolicy,
};
pub use scope::{AllowAll, DomainScope, ScopePolicy};
