//! Tone × mood microcopy table.

use serde::Serialize;
use solace_core::profile::{ConversationMood, TonePreference};

/// Opening, continuation and fallback lines for one tone/mood pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Microcopy {
    pub opening: &'static str,
    pub continuation: &'static str,
    pub fallback: &'static str,
}

const SUPPORTIVE_FALLBACK: &str = "I'm here to support you. What would you like to explore?";
const DIRECT_FALLBACK: &str = "Let's get straight to the point. What's the priority?";
const CURIOUS_FALLBACK: &str = "What would you like to explore together?";

fn fallback_for(tone: TonePreference) -> &'static str {
    match tone {
        TonePreference::Supportive => SUPPORTIVE_FALLBACK,
        TonePreference::Direct => DIRECT_FALLBACK,
        TonePreference::Curious => CURIOUS_FALLBACK,
    }
}

fn table(tone: TonePreference, mood: ConversationMood) -> Microcopy {
    use ConversationMood as M;
    use TonePreference as T;

    let (opening, continuation) = match (tone, mood) {
        (T::Supportive, M::Happy) => (
            "I'm glad you're feeling positive! Let's build on this energy...",
            "That's wonderful to hear. How can we keep this momentum going?",
        ),
        (T::Supportive, M::Neutral) => (
            "I'm here to support you. What's on your mind today?",
            "I'm listening. What else would you like to share?",
        ),
        (T::Supportive, M::Sad) => (
            "I hear your sadness. Would you like to talk about what's weighing on you?",
            "It's okay to feel this way. What would help you feel supported right now?",
        ),
        (T::Supportive, M::Anxious) => (
            "Let's take this one step at a time. What feels most manageable right now?",
            "I understand this feels overwhelming. Let's break it down together.",
        ),
        (T::Supportive, M::Angry) => (
            "I understand you're upset. Let's find a way to process these feelings together.",
            "Your feelings are valid. How can we work through this constructively?",
        ),
        (T::Direct, M::Happy) => (
            "Great! Let's outline your next steps clearly...",
            "Perfect. Here's what we need to focus on next:",
        ),
        (T::Direct, M::Neutral) => (
            "Here's what we need to focus on: [specific steps]",
            "Moving forward, here's the plan:",
        ),
        (T::Direct, M::Sad) => (
            "I see this is hard. Let's break it down into manageable pieces...",
            "Let's create a clear action plan to move forward:",
        ),
        (T::Direct, M::Anxious) => (
            "Let's create a clear plan to address this. First, we'll...",
            "Here's the structured approach we'll take:",
        ),
        (T::Direct, M::Angry) => (
            "Let's take a moment, then we can create an action plan.",
            "Here's how we can address this effectively:",
        ),
        (T::Curious, M::Happy) => (
            "What aspects of this success are most meaningful to you?",
            "What patterns do you notice in what's working well?",
        ),
        (T::Curious, M::Neutral) => (
            "What patterns do you notice in how you approach this?",
            "What connections are you seeing here?",
        ),
        (T::Curious, M::Sad) => (
            "What might help you feel more supported right now?",
            "What insights are emerging from this experience?",
        ),
        (T::Curious, M::Anxious) => (
            "Let's explore what feels most stable in this situation.",
            "What possibilities are you seeing in this challenge?",
        ),
        (T::Curious, M::Angry) => (
            "What's at the heart of what's upsetting you?",
            "What deeper understanding might help us here?",
        ),
    };

    Microcopy {
        opening,
        continuation,
        fallback: fallback_for(tone),
    }
}

/// Pick microcopy for a turn. Without a known mood the opening is the
/// tone's neutral fallback line.
pub fn select(tone: TonePreference, mood: Option<ConversationMood>) -> Microcopy {
    match mood {
        Some(mood) => table(tone, mood),
        None => {
            let neutral = table(tone, ConversationMood::Neutral);
            Microcopy {
                opening: neutral.fallback,
                ..neutral
            }
        }
    }
}

pub fn continuation_cue(tone: TonePreference, mood: Option<ConversationMood>) -> &'static str {
    select(tone, mood).continuation
}

pub fn fallback_cue(tone: TonePreference) -> &'static str {
    fallback_for(tone)
}
