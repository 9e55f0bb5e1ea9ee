//! Retrieval and decay rules shared by every backend.
//!
//! An item decays once per cleanup cycle when its last modification
//! (explicit write or previous decay) is at least `decay_after` old.
//! Items below `prune_below` weight, or past their expiry, are not
//! retrievable.

use chrono::{DateTime, Duration, Utc};
use solace_config::MemoryConfig;
use solace_core::memory::{MemoryItem, MemoryQuery};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPolicy {
    pub decay_after: Duration,
    pub factor: f64,
    pub prune_below: f64,
    pub default_limit: usize,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            decay_after: Duration::days(30),
            factor: 0.9,
            prune_below: 0.1,
            default_limit: 100,
        }
    }
}

impl DecayPolicy {
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self {
            decay_after: Duration::days(i64::from(config.decay_after_days)),
            factor: config.decay_factor,
            prune_below: config.prune_below_weight,
            default_limit: config.default_query_limit,
        }
    }

    /// Whether cleanup at `now` should apply one decay step.
    pub fn is_due(&self, item: &MemoryItem, now: DateTime<Utc>) -> bool {
        now - item.last_modified() >= self.decay_after
    }

    pub fn decayed_weight(&self, weight: f64) -> f64 {
        weight * self.factor
    }

    pub fn is_pruned(&self, item: &MemoryItem) -> bool {
        item.weight < self.prune_below
    }

    pub fn is_retrievable(&self, item: &MemoryItem, now: DateTime<Utc>) -> bool {
        !item.is_expired(now) && !self.is_pruned(item)
    }

    /// Full query predicate, minus the owner check.
    pub fn matches(&self, item: &MemoryItem, query: &MemoryQuery, now: DateTime<Utc>) -> bool {
        if !query.include_expired && !self.is_retrievable(item, now) {
            return false;
        }
        if query.memory_type.is_some_and(|t| t != item.memory_type) {
            return false;
        }
        if query.min_priority.is_some_and(|p| item.priority < p) {
            return false;
        }
        if query.min_weight.is_some_and(|w| item.weight < w) {
            return false;
        }
        query.tags.is_empty() || item.has_any_tag(&query.tags)
    }

    pub fn limit_for(&self, query: &MemoryQuery) -> usize {
        query.limit.unwrap_or(self.default_limit)
    }
}

/// Priority desc, then weight desc, then most recently updated first.
pub fn retrieval_order(a: &MemoryItem, b: &MemoryItem) -> Ordering {
    b.priority
        .partial_cmp(&a.priority)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal))
        .then_with(|| b.updated_at.cmp(&a.updated_at))
}
