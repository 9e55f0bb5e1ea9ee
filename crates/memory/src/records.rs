//! In-memory implementations of the record collaborators: consent
//! records, user profiles and recent messages.
//!
//! These back the CLI fixtures and tests. Production deployments plug in
//! their own stores behind the same traits.

use async_trait::async_trait;
use solace_core::consent::{ConsentSettings, ConsentStore, SessionConsent};
use solace_core::error::Result;
use solace_core::profile::{MessageSource, ProfileSource, RecentMessage, UserProfile};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryConsentStore {
    settings: Arc<RwLock<HashMap<String, ConsentSettings>>>,
    sessions: Arc<RwLock<HashMap<String, SessionConsent>>>,
}

impl InMemoryConsentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsentStore for InMemoryConsentStore {
    async fn get_settings(&self, user_id: &str) -> Result<Option<ConsentSettings>> {
        Ok(self.settings.read().await.get(user_id).cloned())
    }

    async fn put_settings(&self, settings: ConsentSettings) -> Result<()> {
        self.settings
            .write()
            .await
            .insert(settings.user_id.clone(), settings);
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionConsent>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn put_session(&self, session: SessionConsent) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn end_session(&self, session_id: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryProfiles {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, profile: UserProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl ProfileSource for InMemoryProfiles {
    async fn user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }
}

/// Per-user message log, kept in insertion order.
#[derive(Default)]
pub struct InMemoryMessages {
    messages: RwLock<HashMap<String, Vec<RecentMessage>>>,
}

impl InMemoryMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, user_id: &str, message: RecentMessage) {
        self.messages
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(message);
    }
}

#[async_trait]
impl MessageSource for InMemoryMessages {
    async fn recent_messages(&self, user_id: &str, limit: usize) -> Result<Vec<RecentMessage>> {
        let map = self.messages.read().await;
        let Some(log) = map.get(user_id) else {
            return Ok(Vec::new());
        };
        let mut recent = log.clone();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use solace_core::consent::ConsentCategory;

    #[tokio::test]
    async fn consent_store_round_trip() {
        let store = InMemoryConsentStore::new();
        assert!(store.get_settings("u1").await.unwrap().is_none());

        let mut settings = ConsentSettings::all_enabled("u1", Utc::now());
        settings.set(ConsentCategory::GoalLinking, false, Utc::now());
        store.put_settings(settings).await.unwrap();

        let loaded = store.get_settings("u1").await.unwrap().unwrap();
        assert!(!loaded.is_enabled(ConsentCategory::GoalLinking));
        assert!(loaded.is_enabled(ConsentCategory::MoodTracking));
    }

    #[tokio::test]
    async fn ending_a_session_removes_it() {
        let store = InMemoryConsentStore::new();
        store
            .put_session(SessionConsent::new("s1", "u1", Utc::now()))
            .await
            .unwrap();
        assert!(store.end_session("s1").await.unwrap());
        assert!(!store.end_session("s1").await.unwrap());
        assert!(store.get_session("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn messages_come_back_newest_first() {
        let source = InMemoryMessages::new();
        let now = Utc::now();
        for (i, text) in ["first", "second", "third"].iter().enumerate() {
            source
                .push(
                    "u1",
                    RecentMessage {
                        content: text.to_string(),
                        conversation_title: None,
                        created_at: now + Duration::minutes(i as i64),
                    },
                )
                .await;
        }
        let recent = source.recent_messages("u1", 2).await.unwrap();
        let texts: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["third", "second"]);
        assert!(source.recent_messages("nobody", 5).await.unwrap().is_empty());
    }
}
