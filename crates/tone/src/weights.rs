//! Tone weighting, tone memory tags and mood cautions.

use serde::Serialize;
use solace_core::profile::{ConversationMood, TonePreference};

const BASE_WEIGHT: f64 = 0.6;
const MOOD_WEIGHT: f64 = 0.3;
const CONTEXT_WEIGHT: f64 = 0.1;
const DISTRESS_ADJUSTMENT: f64 = 0.1;

/// How much the user's preference, their mood and the conversation each
/// steer the response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToneWeights {
    pub base: f64,
    pub mood: f64,
    pub context: f64,
}

impl ToneWeights {
    pub fn for_turn(tone: TonePreference, mood: Option<ConversationMood>) -> Self {
        let distressed = mood.is_some_and(|m| m.is_distressed());
        match (distressed, tone) {
            (false, _) => Self {
                base: BASE_WEIGHT,
                mood: MOOD_WEIGHT,
                context: CONTEXT_WEIGHT,
            },
            (true, TonePreference::Supportive) => Self {
                base: BASE_WEIGHT + DISTRESS_ADJUSTMENT,
                mood: MOOD_WEIGHT - DISTRESS_ADJUSTMENT,
                context: CONTEXT_WEIGHT,
            },
            (true, _) => Self {
                base: BASE_WEIGHT,
                mood: MOOD_WEIGHT + DISTRESS_ADJUSTMENT,
                context: CONTEXT_WEIGHT,
            },
        }
    }

    /// Base weight as a whole percentage.
    pub fn base_percent(&self) -> u32 {
        (self.base * 100.0).round() as u32
    }
}

pub fn tone_memory_tags(tone: TonePreference) -> &'static [&'static str] {
    match tone {
        TonePreference::Supportive => &["empathy", "support", "encouragement"],
        TonePreference::Direct => &["action", "steps", "clarity"],
        TonePreference::Curious => &["exploration", "patterns", "insights"],
    }
}

/// Whether `tag` belongs to any tone's memory tag set.
pub fn is_tone_tag(tag: &str) -> bool {
    [
        TonePreference::Supportive,
        TonePreference::Direct,
        TonePreference::Curious,
    ]
    .iter()
    .any(|t| tone_memory_tags(*t).contains(&tag))
}

pub fn mood_caution(mood: ConversationMood) -> Option<&'static str> {
    match mood {
        ConversationMood::Sad => Some("Show extra empathy and understanding."),
        ConversationMood::Anxious => Some("Provide clear structure and reassurance."),
        ConversationMood::Angry => Some("Maintain calm and help process emotions."),
        ConversationMood::Happy | ConversationMood::Neutral => None,
    }
}
