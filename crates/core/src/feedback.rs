//! Assistant feedback records and the write collaborator.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTag {
    Helpful,
    Empathetic,
    Insightful,
    Confusing,
    Irrelevant,
    TooShort,
    TooLong,
    TechnicalIssue,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memory_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackInput {
    pub session_id: String,
    /// Anonymous feedback has no user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub rating: u8,
    #[serde(default)]
    pub tags: Vec<FeedbackTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub context: FeedbackContext,
}

impl FeedbackInput {
    /// Collects every problem rather than stopping at the first.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.session_id.trim().is_empty() {
            errors.push("Invalid sessionId".to_string());
        }
        if !(1..=5).contains(&self.rating) {
            errors.push("Rating must be between 1 and 5".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join(", ")))
        }
    }
}

/// Persists feedback. Implementations should be transactional
/// (feedback row + session back-reference).
#[async_trait]
pub trait FeedbackWriter: Send + Sync {
    /// Returns the stored feedback id.
    async fn write(&self, feedback: &FeedbackInput) -> Result<String>;
}
