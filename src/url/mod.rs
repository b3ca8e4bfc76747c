//! URL handling module for Ripple-Frontier
//!
//! This module provides URL normalization (the dedup key), domain extraction,
//! wildcard matching, and domain classification.

mod domain;
mod matcher;
mod normalize;

use crate::config::Config;

pub use domain::{extract_domain, host_key};
pub use matcher::matches_wildcard;
pub use normalize::{normalize_url, resolve_url};

/// Domain classification types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomainClassification {
    /// Quality domain - should be fully crawled
    Quality,
    /// Blacklisted domain - never enqueued
    Blacklisted,
    /// Stubbed domain - noted but never visited
    Stubbed,
    /// Discovered domain - found during crawl
    Discovered,
}

/// Domain pattern lists used for classification
#[derive(Debug, Clone, Default)]
pub struct DomainRules {
    pub quality: Vec<String>,
    pub blacklist: Vec<String>,
    pub stub: Vec<String>,
}

impl DomainRules {
    /// Collects the domain patterns of a configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            quality: config.quality.iter().map(|e| e.domain.clone()).collect(),
            blacklist: config.blacklist.iter().map(|e| e.domain.clone()).collect(),
            stub: config.stub.iter().map(|e| e.domain.clone()).collect(),
        }
    }
}

/// Classifies a domain against a set of rules
///
/// Lists are checked in priority order:
/// 1. Blacklist (highest priority)
/// 2. Stub list
/// 3. Quality list
/// 4. Discovered (default)
///
/// # Examples
///
/// ```
/// use ripple_frontier::url::{classify_domain, DomainClassification, DomainRules};
///
/// let rules = DomainRules {
///     quality: vec!["*.example.com".to_string()],
///     blacklist: vec!["ads.example.com".to_string()],
///     stub: vec![],
/// };
/// assert_eq!(classify_domain("docs.example.com", &rules), DomainClassification::Quality);
/// assert_eq!(classify_domain("ads.example.com", &rules), DomainClassification::Blacklisted);
/// ```
pub fn classify_domain(domain: &str, rules: &DomainRules) -> DomainClassification {
    fn matches_any(patterns: &[String], domain: &str) -> bool {
        patterns.iter().any(|p| matches_wildcard(p, domain))
    }

    if matches_any(&rules.blacklist, domain) {
        DomainClassification::Blacklisted
    } else if matches_any(&rules.stub, domain) {
        DomainClassification::Stubbed
    } else if matches_any(&rules.quality, domain) {
        DomainClassification::Quality
    } else {
        DomainClassification::Discovered
    }
}
