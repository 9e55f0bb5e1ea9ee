//! Section renderers. Each returns `None` when it has nothing to say.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use solace_core::memory::MemoryItem;
use solace_core::profile::{ConversationMood, RecentMessage, TonePreference, UserProfile};
use solace_tone::microcopy;
use solace_tone::weights::{ToneWeights, is_tone_tag, mood_caution};

/// Context sections in the order they are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Tone,
    Memories,
    Messages,
    Profile,
    Reflection,
    Coaching,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Tone => "tone",
            SectionKind::Memories => "memories",
            SectionKind::Messages => "messages",
            SectionKind::Profile => "profile",
            SectionKind::Reflection => "reflection",
            SectionKind::Coaching => "coaching",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn tone_section(
    tone: TonePreference,
    weights: &ToneWeights,
    mood: Option<ConversationMood>,
    is_continuation: bool,
) -> String {
    let instruction = if is_continuation {
        microcopy::continuation_cue(tone, mood)
    } else {
        microcopy::select(tone, mood).opening
    };
    let mut section = format!(
        "AI Tone Preference: {} ({}% weight)\n{instruction}",
        tone.label(),
        weights.base_percent()
    );
    if !is_continuation {
        if let Some(caution) = mood.and_then(mood_caution) {
            section.push('\n');
            section.push_str(caution);
        }
    }
    section
}

/// How well a memory matches the tone vocabulary, weighted by the turn's
/// tone weights. Capped at 1.
pub(crate) fn tone_relevance(item: &MemoryItem, weights: &ToneWeights, now: DateTime<Utc>) -> f64 {
    let mut relevance = 0.0;
    if !item.tags.is_empty() {
        let matches = item.tags.iter().filter(|t| is_tone_tag(t)).count();
        relevance += matches as f64 / item.tags.len() as f64 * weights.base;
    }
    if item.content.chars().count() > 100 {
        relevance += 0.1 * weights.context;
    }
    if now - item.updated_at < Duration::days(1) {
        relevance += 0.1 * weights.mood;
    }
    relevance.min(1.0)
}

pub(crate) fn memory_section(
    memories: &[MemoryItem],
    weights: &ToneWeights,
    now: DateTime<Utc>,
) -> Option<String> {
    if memories.is_empty() {
        return None;
    }
    let lines: Vec<String> = memories
        .iter()
        .map(|m| {
            format!(
                "- [{}] {} (Priority: {}, Weight: {:.2}, Tone Relevance: {:.2})",
                m.memory_type,
                m.content,
                m.priority,
                m.weight,
                tone_relevance(m, weights, now)
            )
        })
        .collect();
    Some(format!("Relevant Memories:\n{}", lines.join("\n")))
}

pub(crate) fn message_section(messages: &[RecentMessage]) -> Option<String> {
    if messages.is_empty() {
        return None;
    }
    let lines: Vec<String> = messages
        .iter()
        .map(|m| {
            format!(
                "[{}] {}",
                m.conversation_title.as_deref().unwrap_or("General"),
                m.content
            )
        })
        .collect();
    Some(format!("Recent Conversation Context:\n{}", lines.join("\n")))
}

pub(crate) fn profile_section(profile: &UserProfile) -> String {
    let preferences = if profile.preferences.is_null() {
        "{}".to_string()
    } else {
        profile.preferences.to_string()
    };
    format!(
        "User Profile Context:\n- Current Mood: {}\n- Preferences: {preferences}\n- Language: {}",
        profile.latest_mood.as_deref().unwrap_or("unknown"),
        profile.language
    )
}
