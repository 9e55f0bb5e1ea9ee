//! In-memory store: useful for testing and ephemeral sessions.

use crate::decay::{DecayPolicy, retrieval_order};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solace_core::error::{Error, Result};
use solace_core::memory::{
    CleanupReport, MemoryItem, MemoryPatch, MemoryQuery, MemoryStore, NewMemory,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// A memory store backed by a `HashMap` keyed by item id.
///
/// Every read-modify-write of a single item happens under the write lock,
/// and decay is a compare-and-swap on the item's `version`.
pub struct InMemoryStore {
    items: Arc<RwLock<HashMap<String, MemoryItem>>>,
    policy: DecayPolicy,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_policy(DecayPolicy::default())
    }

    pub fn with_policy(policy: DecayPolicy) -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
            policy,
        }
    }

    /// Insert a fully-formed item, replacing any item with the same id.
    /// Used to seed fixtures with historical timestamps.
    pub async fn insert_item(&self, item: MemoryItem) {
        self.items.write().await.insert(item.id.clone(), item);
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Apply one decay step if the item is still at `expected_version`.
    async fn decay_if_unchanged(&self, id: &str, expected_version: u64, now: DateTime<Utc>) -> bool {
        let mut items = self.items.write().await;
        match items.get_mut(id) {
            Some(item) if item.version == expected_version => {
                item.weight = self.policy.decayed_weight(item.weight);
                item.last_decayed_at = Some(now);
                item.version += 1;
                true
            }
            _ => false,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn add(&self, memory: NewMemory) -> Result<MemoryItem> {
        validate_new(&memory)?;
        let item = memory.into_item(Uuid::new_v4().to_string(), Utc::now());
        self.items.write().await.insert(item.id.clone(), item.clone());
        debug!(id = %item.id, user_id = %item.user_id, "Stored memory");
        Ok(item)
    }

    async fn get(&self, id: &str) -> Result<Option<MemoryItem>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn query(&self, user_id: &str, query: MemoryQuery) -> Result<Vec<MemoryItem>> {
        let now = Utc::now();
        let items = self.items.read().await;
        let mut results: Vec<MemoryItem> = items
            .values()
            .filter(|i| i.user_id == user_id && self.policy.matches(i, &query, now))
            .cloned()
            .collect();
        results.sort_by(retrieval_order);
        results.truncate(self.policy.limit_for(&query));
        Ok(results)
    }

    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<MemoryItem> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("memory {id}")))?;
        patch.apply(item, Utc::now());
        Ok(item.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.items.write().await.remove(id).is_some())
    }

    async fn cleanup(&self) -> Result<CleanupReport> {
        let now = Utc::now();
        let mut report = CleanupReport::default();

        {
            let mut items = self.items.write().await;
            let before = items.len();
            items.retain(|_, i| !i.is_expired(now));
            report.expired_removed = before - items.len();
        }

        // Snapshot candidates, then CAS each one so a concurrent write wins.
        let due: Vec<(String, u64)> = self
            .items
            .read()
            .await
            .values()
            .filter(|i| self.policy.is_due(i, now))
            .map(|i| (i.id.clone(), i.version))
            .collect();

        for (id, version) in due {
            if self.decay_if_unchanged(&id, version, now).await {
                report.decayed += 1;
            } else {
                report.skipped_conflicts += 1;
            }
        }

        {
            let mut items = self.items.write().await;
            let before = items.len();
            items.retain(|_, i| !self.policy.is_pruned(i));
            report.pruned = before - items.len();
        }

        info!(
            removed = report.expired_removed,
            decayed = report.decayed,
            skipped = report.skipped_conflicts,
            pruned = report.pruned,
            "In-memory cleanup complete"
        );
        Ok(report)
    }
}

/// Shared creation checks for every backend.
pub(crate) fn validate_new(memory: &NewMemory) -> Result<()> {
    if memory.user_id.trim().is_empty() {
        return Err(Error::Validation("user_id must not be empty".into()));
    }
    if memory.content.trim().is_empty() {
        return Err(Error::Validation("content must not be empty".into()));
    }
    if !memory.priority.is_finite() || memory.priority < 0.0 {
        return Err(Error::Validation(format!(
            "priority must be a non-negative number, got {}",
            memory.priority
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use solace_core::memory::MemoryType;

    fn aged(id: &str, weight: f64, days: i64) -> MemoryItem {
        NewMemory::new("u1", MemoryType::LongTerm, format!("memory {id}"))
            .with_priority(1.0)
            .with_weight(weight)
            .into_item(id.into(), Utc::now() - Duration::days(days))
    }

    #[tokio::test]
    async fn add_and_get() {
        let store = InMemoryStore::new();
        let item = store
            .add(NewMemory::new("u1", MemoryType::ShortTerm, "Walked by the river"))
            .await
            .unwrap();
        assert_eq!(item.version, 1);
        let fetched = store.get(&item.id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "Walked by the river");
    }

    #[tokio::test]
    async fn add_rejects_empty_fields() {
        let store = InMemoryStore::new();
        let err = store
            .add(NewMemory::new("", MemoryType::ShortTerm, "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = store
            .add(NewMemory::new("u1", MemoryType::ShortTerm, "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn query_scopes_filters_and_orders() {
        let store = InMemoryStore::new();
        store
            .add(NewMemory::new("u1", MemoryType::LongTerm, "a").with_priority(0.5))
            .await
            .unwrap();
        store
            .add(NewMemory::new("u1", MemoryType::LongTerm, "b").with_priority(0.9))
            .await
            .unwrap();
        store
            .add(NewMemory::new("u1", MemoryType::ShortTerm, "c").with_priority(1.0))
            .await
            .unwrap();
        store
            .add(NewMemory::new("u2", MemoryType::LongTerm, "d").with_priority(1.0))
            .await
            .unwrap();

        let results = store
            .query(
                "u1",
                MemoryQuery {
                    memory_type: Some(MemoryType::LongTerm),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let contents: Vec<_> = results.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn query_applies_limit() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .add(NewMemory::new("u1", MemoryType::ShortTerm, format!("m{i}")))
                .await
                .unwrap();
        }
        let results = store
            .query(
                "u1",
                MemoryQuery {
                    limit: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.update("nope", MemoryPatch::default()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn cleanup_decays_exactly_once() {
        let store = InMemoryStore::new();
        store.insert_item(aged("old", 0.8, 45)).await;
        store.insert_item(aged("fresh", 0.8, 2)).await;

        let report = store.cleanup().await.unwrap();
        assert_eq!(report.decayed, 1);
        let old = store.get("old").await.unwrap().unwrap();
        assert!((old.weight - 0.72).abs() < 1e-9);
        assert_eq!(store.get("fresh").await.unwrap().unwrap().weight, 0.8);

        // A second run right away must not decay again.
        let again = store.cleanup().await.unwrap();
        assert_eq!(again.decayed, 0);
        let old = store.get("old").await.unwrap().unwrap();
        assert!((old.weight - 0.72).abs() < 1e-9);
    }

    #[tokio::test]
    async fn cleanup_prunes_and_expires() {
        let store = InMemoryStore::new();
        store.insert_item(aged("faint", 0.105, 40)).await;
        let mut expired = aged("expired", 1.0, 1);
        expired.expires_at = Some(Utc::now() - Duration::hours(1));
        store.insert_item(expired).await;
        store.insert_item(aged("keep", 0.9, 1)).await;

        let report = store.cleanup().await.unwrap();
        assert_eq!(report.expired_removed, 1);
        assert_eq!(report.pruned, 1);
        assert!(store.get("faint").await.unwrap().is_none());
        assert!(store.get("expired").await.unwrap().is_none());
        assert!(store.get("keep").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_cleanups_do_not_double_decay() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_item(aged("old", 1.0, 60)).await;

        let a = tokio::spawn({
            let s = store.clone();
            async move { s.cleanup().await.unwrap() }
        });
        let b = tokio::spawn({
            let s = store.clone();
            async move { s.cleanup().await.unwrap() }
        });
        let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(ra.decayed + rb.decayed, 1);

        let old = store.get("old").await.unwrap().unwrap();
        assert!((old.weight - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn consumer_write_during_cleanup_is_preserved() {
        let store = InMemoryStore::new();
        store.insert_item(aged("old", 1.0, 60)).await;
        let stale_version = store.get("old").await.unwrap().unwrap().version;

        store
            .update(
                "old",
                MemoryPatch {
                    content: Some("rewritten".into()),
                    weight: Some(0.95),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!store.decay_if_unchanged("old", stale_version, Utc::now()).await);
        let item = store.get("old").await.unwrap().unwrap();
        assert_eq!(item.content, "rewritten");
        assert_eq!(item.weight, 0.95);
    }

    #[tokio::test]
    async fn pruned_items_are_hidden_before_cleanup() {
        let store = InMemoryStore::new();
        store.insert_item(aged("faint", 0.05, 1)).await;
        let results = store.query("u1", MemoryQuery::default()).await.unwrap();
        assert!(results.is_empty());
        let all = store
            .query(
                "u1",
                MemoryQuery {
                    include_expired: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }
}
