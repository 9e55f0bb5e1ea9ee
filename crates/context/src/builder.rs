//! Per-turn context assembly.
//!
//! For every assistant turn the builder collects the user's profile and
//! latest mood, tone-weighted memories and recent messages, renders them as
//! sections, optionally adds reflection and coaching prompts for journal
//! sessions, and trims whole trailing sections until the text fits the
//! token budget.
//!
//! Consent is resolved first. Mood only shapes the turn while mood tracking
//! is in effect, continuation cues need tone continuity, and reflection and
//! coaching need reflection history. Memory and message text always passes
//! through the redaction engine before it is rendered.
//!
//! Collaborator failures never abort a build: the affected section is
//! omitted and a warning is logged. An unreadable consent record withholds
//! every consent category.

use crate::sections::{
    SectionKind, memory_section, message_section, profile_section, tone_section,
};
use crate::token::{estimate_tokens, joined_tokens};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use solace_config::ContextConfig;
use solace_core::consent::ConsentCategory;
use solace_core::memory::{MemoryItem, MemoryQuery, MemoryStore, MemoryType};
use solace_core::profile::{
    ConversationMood, MessageSource, ProfileSource, RecentMessage, TonePreference, UserProfile,
};
use solace_privacy::{ConsentPolicyEngine, ConsentStatus, PrivacyFlags, RedactionEngine};
use solace_tone::coaching::{CoachingEngine, CoachingInput};
use solace_tone::reflection::ReflectionEngine;
use solace_tone::weights::{ToneWeights, tone_memory_tags};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Minimum length of a message that reads like a journal entry.
const JOURNAL_ENTRY_MIN_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextScope {
    #[default]
    ShortTerm,
    LongTerm,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Journal,
    #[default]
    Conversation,
    Reflection,
    Coaching,
}

/// Per-call options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// Falls back to the builder's configured budget when `None`.
    pub max_tokens: Option<usize>,
    pub include_recent_messages: bool,
    pub include_profile: bool,
    pub custom_tags: Vec<String>,
    pub tone_preference: TonePreference,
    pub is_continuation: bool,
    pub session_type: SessionType,
    pub coaching_enabled: bool,
    /// Session whose temporary opt-outs apply to this turn.
    pub session_id: Option<String>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_tokens: None,
            include_recent_messages: true,
            include_profile: true,
            custom_tags: Vec::new(),
            tone_preference: TonePreference::Supportive,
            is_continuation: false,
            session_type: SessionType::Conversation,
            coaching_enabled: true,
            session_id: None,
        }
    }
}

/// Builder-wide limits, normally taken from `[context]` in the config file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextDefaults {
    pub max_tokens: usize,
    pub memory_limit: usize,
    pub memory_min_weight: f64,
    pub recent_message_limit: usize,
}

impl Default for ContextDefaults {
    fn default() -> Self {
        Self::from_config(&ContextConfig::default())
    }
}

impl ContextDefaults {
    pub fn from_config(config: &ContextConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            memory_limit: config.memory_limit,
            memory_min_weight: config.memory_min_weight,
            recent_message_limit: config.recent_message_limit,
        }
    }
}

/// The collaborators a builder reads from.
#[derive(Clone)]
pub struct ContextSources {
    pub memory: Arc<dyn MemoryStore>,
    pub profiles: Arc<dyn ProfileSource>,
    pub messages: Arc<dyn MessageSource>,
    pub consent: Arc<ConsentPolicyEngine>,
}

/// Result of a build with a record of what made it in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledContext {
    pub text: String,
    pub sections: Vec<SectionKind>,
    /// Sections rendered but removed to meet the budget.
    pub dropped: Vec<SectionKind>,
    pub estimated_tokens: usize,
}

pub struct ContextBuilder {
    sources: ContextSources,
    defaults: ContextDefaults,
    redaction: RedactionEngine,
    privacy: PrivacyFlags,
    reflection: ReflectionEngine,
    coaching: CoachingEngine,
}

impl ContextBuilder {
    pub fn new(sources: ContextSources, defaults: ContextDefaults) -> Self {
        Self {
            sources,
            defaults,
            redaction: RedactionEngine::new(),
            privacy: PrivacyFlags::default(),
            reflection: ReflectionEngine::new(),
            coaching: CoachingEngine::new(),
        }
    }

    /// Flags applied when redacting memory and message text.
    pub fn with_privacy_flags(mut self, flags: PrivacyFlags) -> Self {
        self.privacy = flags;
        self
    }

    pub fn defaults(&self) -> &ContextDefaults {
        &self.defaults
    }

    pub async fn build(&self, user_id: &str, scope: ContextScope, options: ContextOptions) -> String {
        self.build_with_report(user_id, scope, options).await.text
    }

    pub async fn build_with_report(
        &self,
        user_id: &str,
        scope: ContextScope,
        options: ContextOptions,
    ) -> AssembledContext {
        let max_tokens = options.max_tokens.unwrap_or(self.defaults.max_tokens);
        let tone = options.tone_preference;

        let consent = self.consent_for(user_id, options.session_id.as_deref()).await;
        let mood_allowed = consent.is_enabled(ConsentCategory::MoodTracking);
        let reflection_allowed = consent.is_enabled(ConsentCategory::ReflectionHistory);
        let is_continuation =
            options.is_continuation && consent.is_enabled(ConsentCategory::ToneContinuity);

        let mut profile = if options.include_profile {
            self.fetch_profile(user_id).await
        } else {
            None
        };
        if !mood_allowed {
            if let Some(p) = profile.as_mut() {
                p.latest_mood = None;
            }
        }
        let mood = profile.as_ref().and_then(UserProfile::current_mood);
        let weights = ToneWeights::for_turn(tone, mood);

        let mut memories = self.fetch_memories(user_id, scope, &options).await;
        let mut messages = if options.include_recent_messages {
            self.fetch_messages(user_id).await
        } else {
            Vec::new()
        };
        let redacted = memories
            .iter_mut()
            .map(|m| &mut m.content)
            .chain(messages.iter_mut().map(|m| &mut m.content))
            .map(|content| self.redact(content))
            .filter(|masked| *masked)
            .count();
        if redacted > 0 {
            debug!(user_id = %user_id, redacted, "Personal information masked in context");
        }

        let now = Utc::now();
        let mut sections: Vec<(SectionKind, String)> = vec![(
            SectionKind::Tone,
            tone_section(tone, &weights, mood, is_continuation),
        )];
        if let Some(s) = memory_section(&memories, &weights, now) {
            sections.push((SectionKind::Memories, s));
        }
        if let Some(s) = message_section(&messages) {
            sections.push((SectionKind::Messages, s));
        }
        if let Some(p) = &profile {
            sections.push((SectionKind::Profile, profile_section(p)));
        }

        if options.session_type == SessionType::Journal {
            if !reflection_allowed {
                debug!(user_id = %user_id, "Reflection history withheld, skipping reflection and coaching");
            } else if let Some(latest) = messages.first() {
                let prompt = self.reflection.build_prompt(&latest.content, mood, tone);
                let reflection_tokens = self.reflection.estimate_tokens(&prompt);
                debug!(user_id = %user_id, tokens = reflection_tokens, "Reflection section added");
                let focus_areas: Vec<String> = prompt
                    .metadata
                    .focus_areas
                    .iter()
                    .map(|a| a.to_string())
                    .collect();
                sections.push((SectionKind::Reflection, self.reflection.format(&prompt)));

                if options.coaching_enabled && should_offer_coaching(&messages, tone, mood) {
                    self.push_coaching(&mut sections, &messages, mood, tone, focus_areas, max_tokens);
                }
            }
        }

        let assembled = trim_to_budget(sections, max_tokens);
        info!(
            user_id = %user_id,
            sections = assembled.sections.len(),
            dropped = assembled.dropped.len(),
            tokens = assembled.estimated_tokens,
            max_tokens,
            "Context assembled"
        );
        assembled
    }

    fn push_coaching(
        &self,
        sections: &mut Vec<(SectionKind, String)>,
        messages: &[RecentMessage],
        mood: Option<ConversationMood>,
        tone: TonePreference,
        focus_areas: Vec<String>,
        max_tokens: usize,
    ) {
        let (Some(reflection), Some(entry)) = (messages.first(), messages.get(1)) else {
            return;
        };
        let prompt = self.coaching.build_prompt(CoachingInput {
            entry: entry.content.clone(),
            reflection: reflection.content.clone(),
            mood,
            tone,
            focus_areas,
        });
        let text = self.coaching.format(&prompt);
        let coaching_tokens = estimate_tokens(&text);

        if fits_with(sections, &text, max_tokens) {
            debug!(tokens = coaching_tokens, "Coaching section added");
            sections.push((SectionKind::Coaching, text));
        } else {
            debug!(
                tokens = coaching_tokens,
                max_tokens, "Coaching section skipped, over budget"
            );
        }
    }

    /// Mask `content` in place. Returns whether anything was redacted.
    fn redact(&self, content: &mut String) -> bool {
        let result = self
            .redaction
            .classify_and_redact(Some(content.as_str()), &self.privacy);
        if result.clean_content == *content {
            return false;
        }
        *content = result.clean_content;
        true
    }

    async fn consent_for(&self, user_id: &str, session_id: Option<&str>) -> ConsentStatus {
        match self.sources.consent.consent_status(user_id, session_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Consent unavailable, withholding personal context");
                ConsentStatus::default()
            }
        }
    }

    async fn fetch_profile(&self, user_id: &str) -> Option<UserProfile> {
        match self.sources.profiles.user_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Profile lookup failed, continuing without profile");
                None
            }
        }
    }

    async fn fetch_memories(
        &self,
        user_id: &str,
        scope: ContextScope,
        options: &ContextOptions,
    ) -> Vec<MemoryItem> {
        let mut tags = options.custom_tags.clone();
        for tag in tone_memory_tags(options.tone_preference) {
            if !tags.iter().any(|t| t == tag) {
                tags.push((*tag).to_string());
            }
        }
        let query = MemoryQuery {
            memory_type: Some(match scope {
                ContextScope::LongTerm => MemoryType::LongTerm,
                ContextScope::ShortTerm => MemoryType::ShortTerm,
            }),
            tags,
            min_weight: Some(self.defaults.memory_min_weight),
            limit: Some(self.defaults.memory_limit),
            ..Default::default()
        };
        match self.sources.memory.query(user_id, query).await {
            Ok(items) => items,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Memory query failed, continuing without memories");
                Vec::new()
            }
        }
    }

    async fn fetch_messages(&self, user_id: &str) -> Vec<RecentMessage> {
        match self
            .sources
            .messages
            .recent_messages(user_id, self.defaults.recent_message_limit)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Recent messages unavailable, continuing without history");
                Vec::new()
            }
        }
    }
}

/// A journal entry followed by a reflection, an active tone and a mood
/// that can take a nudge.
fn should_offer_coaching(
    messages: &[RecentMessage],
    tone: TonePreference,
    mood: Option<ConversationMood>,
) -> bool {
    let (Some(latest), Some(previous)) = (messages.first(), messages.get(1)) else {
        return false;
    };
    let reflection_sequence = previous.content.chars().count() > JOURNAL_ENTRY_MIN_CHARS
        && (latest.content.contains("reflection") || latest.content.contains("consider"));
    let active_tone = matches!(tone, TonePreference::Direct | TonePreference::Curious);
    let suitable_mood = !matches!(
        mood,
        Some(ConversationMood::Sad) | Some(ConversationMood::Anxious)
    );
    reflection_sequence && active_tone && suitable_mood
}

/// Whether `candidate`, appended after `sections`, still fits the budget
/// once joined.
fn fits_with(sections: &[(SectionKind, String)], candidate: &str, max_tokens: usize) -> bool {
    let mut texts: Vec<&str> = sections.iter().map(|(_, s)| s.as_str()).collect();
    texts.push(candidate);
    joined_tokens(&texts) <= max_tokens
}

/// Drop whole sections from the end until the joined text fits.
fn trim_to_budget(mut sections: Vec<(SectionKind, String)>, max_tokens: usize) -> AssembledContext {
    let mut dropped = Vec::new();
    loop {
        let texts: Vec<&str> = sections.iter().map(|(_, s)| s.as_str()).collect();
        if sections.is_empty() || joined_tokens(&texts) <= max_tokens {
            break;
        }
        if let Some((kind, _)) = sections.pop() {
            dropped.push(kind);
        }
    }
    if !dropped.is_empty() {
        warn!(dropped = ?dropped, max_tokens, "Context sections trimmed to fit budget");
    }
    dropped.reverse();

    let (kinds, texts): (Vec<SectionKind>, Vec<String>) = sections.into_iter().unzip();
    let text = texts.join("\n\n");
    AssembledContext {
        estimated_tokens: estimate_tokens(&text),
        text,
        sections: kinds,
        dropped,
    }
}
