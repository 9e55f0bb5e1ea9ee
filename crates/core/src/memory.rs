//! Memory trait: persistent, weighted, decaying storage of memory items.
//!
//! A memory item is a stored fact or utterance available to personalize
//! future assistant responses. Each item carries a user-assigned `priority`
//! and a `weight` that decays with age; items whose weight falls below the
//! prune threshold, or whose `expires_at` has passed, are not retrievable
//! and are eventually purged by [`MemoryStore::cleanup`].

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Memory classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    ShortTerm,
    LongTerm,
    Episodic,
    Semantic,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::ShortTerm => "short_term",
            MemoryType::LongTerm => "long_term",
            MemoryType::Episodic => "episodic",
            MemoryType::Semantic => "semantic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "short_term" => Some(MemoryType::ShortTerm),
            "long_term" => Some(MemoryType::LongTerm),
            "episodic" => Some(MemoryType::Episodic),
            "semantic" => Some(MemoryType::Semantic),
            _ => None,
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Unique ID for this memory
    pub id: String,

    /// Owning user
    pub user_id: String,

    #[serde(rename = "type")]
    pub memory_type: MemoryType,

    /// The content of the memory
    pub content: String,

    /// Tags for categorization (set semantics)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// User/system assigned importance
    pub priority: f64,

    /// Relevance after decay; starts at or below `priority`
    pub weight: f64,

    pub created_at: DateTime<Utc>,

    /// Last explicit write
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(default)]
    pub metadata: serde_json::Value,

    /// Write counter used for compare-and-swap by the store
    #[serde(default)]
    pub version: u64,

    /// When cleanup last decayed this item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_decayed_at: Option<DateTime<Utc>>,
}

impl MemoryItem {
    /// Last modification of any kind (explicit write or decay step).
    pub fn last_modified(&self) -> DateTime<Utc> {
        match self.last_decayed_at {
            Some(decayed) if decayed > self.updated_at => decayed,
            _ => self.updated_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.tags.contains(t))
    }
}

/// Creation payload for a memory. Ids, timestamps and version are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMemory {
    pub user_id: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub priority: f64,
    /// Initial weight; defaults to `priority` and is clamped to it.
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl NewMemory {
    pub fn new(user_id: impl Into<String>, memory_type: MemoryType, content: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            memory_type,
            content: content.into(),
            tags: Vec::new(),
            priority: 1.0,
            weight: None,
            expires_at: None,
            conversation_id: None,
            message_id: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Materialize into a stored item.
    pub fn into_item(self, id: String, now: DateTime<Utc>) -> MemoryItem {
        let weight = self.weight.unwrap_or(self.priority).min(self.priority);
        let mut tags = self.tags;
        tags.sort();
        tags.dedup();
        MemoryItem {
            id,
            user_id: self.user_id,
            memory_type: self.memory_type,
            content: self.content,
            tags,
            priority: self.priority,
            weight,
            created_at: now,
            updated_at: now,
            expires_at: self.expires_at,
            conversation_id: self.conversation_id,
            message_id: self.message_id,
            metadata: self.metadata,
            version: 1,
            last_decayed_at: None,
        }
    }
}

/// Partial update. Every applied patch counts as an explicit write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryPatch {
    #[serde(default)]
    pub memory_type: Option<MemoryType>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    /// `Some(None)` clears the expiry.
    #[serde(default)]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl MemoryPatch {
    /// Apply to an item, bumping `updated_at` and `version`.
    pub fn apply(self, item: &mut MemoryItem, now: DateTime<Utc>) {
        if let Some(t) = self.memory_type {
            item.memory_type = t;
        }
        if let Some(c) = self.content {
            item.content = c;
        }
        if let Some(mut tags) = self.tags {
            tags.sort();
            tags.dedup();
            item.tags = tags;
        }
        if let Some(p) = self.priority {
            item.priority = p;
        }
        if let Some(w) = self.weight {
            item.weight = w;
        }
        if let Some(exp) = self.expires_at {
            item.expires_at = exp;
        }
        if let Some(m) = self.metadata {
            item.metadata = m;
        }
        item.updated_at = now;
        item.version += 1;
    }
}

/// A query for retrieving memories of one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryQuery {
    #[serde(default)]
    pub memory_type: Option<MemoryType>,

    /// Match items carrying any of these tags. Empty = no tag filter.
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub min_priority: Option<f64>,

    #[serde(default)]
    pub min_weight: Option<f64>,

    /// Maximum number of results; the store default applies when `None`.
    #[serde(default)]
    pub limit: Option<usize>,

    /// Also return expired and weight-pruned items.
    #[serde(default)]
    pub include_expired: bool,
}

/// Outcome of one cleanup cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub expired_removed: usize,
    pub decayed: usize,
    /// Decay writes skipped because the item changed concurrently.
    pub skipped_conflicts: usize,
    pub pruned: usize,
}

/// The core MemoryStore trait.
///
/// Implementations: SQLite, in-memory (for testing and ephemeral sessions).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Store a new memory and return it as persisted.
    async fn add(&self, memory: NewMemory) -> Result<MemoryItem>;

    /// Get a memory by ID (regardless of expiry or weight).
    async fn get(&self, id: &str) -> Result<Option<MemoryItem>>;

    /// Retrieve memories ordered by priority desc, weight desc, updated_at desc.
    async fn query(&self, user_id: &str, query: MemoryQuery) -> Result<Vec<MemoryItem>>;

    /// Apply an explicit update.
    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<MemoryItem>;

    /// Delete a memory by ID.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Expire, decay and prune. Safe to run concurrently and periodically.
    async fn cleanup(&self) -> Result<CleanupReport>;
}
