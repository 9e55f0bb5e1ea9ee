//! Consent model: per-user category settings and per-session overrides.
//!
//! Session overrides can only revoke a category for the lifetime of the
//! session; they never grant anything the user setting does not.

use crate::error::{ConsentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A toggleable personalization domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsentCategory {
    MoodTracking,
    ToneContinuity,
    GoalLinking,
    ReflectionHistory,
}

impl ConsentCategory {
    pub const ALL: [ConsentCategory; 4] = [
        ConsentCategory::MoodTracking,
        ConsentCategory::ToneContinuity,
        ConsentCategory::GoalLinking,
        ConsentCategory::ReflectionHistory,
    ];

    /// Wire name, as used in prompts and APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentCategory::MoodTracking => "moodTracking",
            ConsentCategory::ToneContinuity => "toneContinuity",
            ConsentCategory::GoalLinking => "goalLinking",
            ConsentCategory::ReflectionHistory => "reflectionHistory",
        }
    }
}

impl std::fmt::Display for ConsentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConsentCategory {
    type Err = ConsentError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ConsentCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConsentError::InvalidCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryConsent {
    pub enabled: bool,
    pub last_updated: DateTime<Utc>,
}

/// One record per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentSettings {
    pub user_id: String,
    pub categories: BTreeMap<ConsentCategory, CategoryConsent>,
}

impl ConsentSettings {
    /// Defaults on creation: everything enabled.
    pub fn all_enabled(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let categories = ConsentCategory::ALL
            .into_iter()
            .map(|c| (c, CategoryConsent { enabled: true, last_updated: now }))
            .collect();
        Self {
            user_id: user_id.into(),
            categories,
        }
    }

    /// A category without a record is treated as disabled.
    pub fn is_enabled(&self, category: ConsentCategory) -> bool {
        self.categories.get(&category).is_some_and(|c| c.enabled)
    }

    pub fn set(&mut self, category: ConsentCategory, enabled: bool, now: DateTime<Utc>) {
        self.categories.insert(category, CategoryConsent { enabled, last_updated: now });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentOverride {
    pub enabled: bool,
    pub temporary_opt_out: bool,
}

impl ConsentOverride {
    pub fn opt_out() -> Self {
        Self {
            enabled: false,
            temporary_opt_out: true,
        }
    }
}

/// Ephemeral per-session revocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConsent {
    pub session_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub overrides: BTreeMap<ConsentCategory, ConsentOverride>,
}

impl SessionConsent {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            created_at: now,
            overrides: BTreeMap::new(),
        }
    }

    pub fn is_opted_out(&self, category: ConsentCategory) -> bool {
        self.overrides.get(&category).is_some_and(|o| o.temporary_opt_out)
    }
}

/// Persistent store collaborator for consent records.
#[async_trait]
pub trait ConsentStore: Send + Sync {
    async fn get_settings(&self, user_id: &str) -> Result<Option<ConsentSettings>>;

    async fn put_settings(&self, settings: ConsentSettings) -> Result<()>;

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionConsent>>;

    async fn put_session(&self, session: SessionConsent) -> Result<()>;

    /// Drop a session's overrides. Returns whether one existed.
    async fn end_session(&self, session_id: &str) -> Result<bool>;
}
