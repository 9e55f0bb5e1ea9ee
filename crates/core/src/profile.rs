//! Conversation-facing collaborators: user profile, recent messages,
//! tone preference and the conversational mood vocabulary.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the assistant should phrase its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TonePreference {
    #[default]
    Supportive,
    Direct,
    Curious,
}

impl TonePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            TonePreference::Supportive => "supportive",
            TonePreference::Direct => "direct",
            TonePreference::Curious => "curious",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TonePreference::Supportive => "Supportive",
            TonePreference::Direct => "Direct",
            TonePreference::Curious => "Curious",
        }
    }
}

impl std::fmt::Display for TonePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TonePreference {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "supportive" => Ok(TonePreference::Supportive),
            "direct" => Ok(TonePreference::Direct),
            "curious" => Ok(TonePreference::Curious),
            other => Err(crate::error::Error::Validation(format!("unknown tone: {other}"))),
        }
    }
}

/// Mood vocabulary used when adapting tone for a live turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMood {
    Happy,
    Neutral,
    Sad,
    Anxious,
    Angry,
}

impl ConversationMood {
    /// Case-insensitive; unknown labels yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Some(ConversationMood::Happy),
            "neutral" => Some(ConversationMood::Neutral),
            "sad" => Some(ConversationMood::Sad),
            "anxious" => Some(ConversationMood::Anxious),
            "angry" => Some(ConversationMood::Angry),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationMood::Happy => "happy",
            ConversationMood::Neutral => "neutral",
            ConversationMood::Sad => "sad",
            ConversationMood::Anxious => "anxious",
            ConversationMood::Angry => "angry",
        }
    }

    /// Moods that call for a gentler register.
    pub fn is_distressed(&self) -> bool {
        matches!(
            self,
            ConversationMood::Sad | ConversationMood::Anxious | ConversationMood::Angry
        )
    }
}

impl std::fmt::Display for ConversationMood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub preferences: serde_json::Value,
    /// Raw label of the most recent mood entry, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_mood: Option<String>,
}

fn default_language() -> String {
    "en".into()
}

impl UserProfile {
    pub fn current_mood(&self) -> Option<ConversationMood> {
        self.latest_mood.as_deref().and_then(ConversationMood::parse)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn user_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
}

/// Recent messages are returned newest first.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn recent_messages(&self, user_id: &str, limit: usize) -> Result<Vec<RecentMessage>>;
}
