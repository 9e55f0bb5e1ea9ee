//! Coaching prompts that follow a journal entry and its reflection.

use serde::Serialize;
use solace_core::profile::{ConversationMood, TonePreference};
use solace_core::token::estimate_tokens;

struct ToneFraming {
    action: &'static str,
    agency: &'static str,
    boundary: &'static str,
}

fn framing(tone: TonePreference) -> ToneFraming {
    match tone {
        TonePreference::Supportive => ToneFraming {
            action: "You might consider exploring",
            agency: "What feels right for you?",
            boundary: "Remember, these are suggestions for exploration, not directives. You know your situation best.",
        },
        TonePreference::Direct => ToneFraming {
            action: "Let's identify specific steps",
            agency: "What concrete actions could you take?",
            boundary: "These are starting points for your exploration. The pace and direction are yours to determine.",
        },
        TonePreference::Curious => ToneFraming {
            action: "What possibilities emerge when you consider",
            agency: "What discoveries might you make?",
            boundary: "These are invitations to explore. Your journey of discovery is unique to you.",
        },
    }
}

fn mood_action(mood: ConversationMood, tone: TonePreference) -> &'static str {
    use ConversationMood as M;
    use TonePreference as T;
    match (mood, tone) {
        (M::Happy, T::Supportive) => "building on this positive energy",
        (M::Happy, T::Direct) => "capitalizing on this momentum",
        (M::Happy, T::Curious) => "exploring what's working well",
        (M::Neutral, T::Supportive) => "finding your next step",
        (M::Neutral, T::Direct) => "identifying clear actions",
        (M::Neutral, T::Curious) => "discovering new possibilities",
        (M::Sad, T::Supportive) => "finding gentle ways forward",
        (M::Sad, T::Direct) => "taking small, manageable steps",
        (M::Sad, T::Curious) => "exploring what might help",
        (M::Anxious, T::Supportive) => "creating a sense of safety",
        (M::Anxious, T::Direct) => "breaking this down into smaller pieces",
        (M::Anxious, T::Curious) => "understanding what's beneath the surface",
        (M::Angry, T::Supportive) => "channeling this energy constructively",
        (M::Angry, T::Direct) => "focusing on what you can control",
        (M::Angry, T::Curious) => "exploring what this is telling you",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoachingInput {
    pub entry: String,
    pub reflection: String,
    pub mood: Option<ConversationMood>,
    pub tone: TonePreference,
    pub focus_areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachingMetadata {
    pub tone: TonePreference,
    pub mood: Option<ConversationMood>,
    pub focus_areas: Vec<String>,
    pub token_estimate: usize,
}

/// Each section already carries its bracketed header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachingPrompt {
    pub context: String,
    pub reflection: String,
    pub action_frame: String,
    pub boundaries: String,
    pub metadata: CoachingMetadata,
}

/// The first two sentences of the reflection that address the user.
fn key_insights(reflection: &str) -> String {
    let picked: Vec<&str> = reflection
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.contains("you") || s.contains("your") || s.contains("this"))
        .take(2)
        .collect();
    format!("{}.", picked.join(". "))
}

fn action_frame(input: &CoachingInput, framing: &ToneFraming, action: &str) -> String {
    let mut frame = format!("{} {}. ", framing.action, action);
    match input.focus_areas.as_slice() {
        [] => {}
        [only] => frame.push_str(&format!(
            "What small adjustments could you make in this {only} area? "
        )),
        many => frame.push_str(&format!(
            "What small adjustments could you make in these areas of {}? ",
            many.join(" and ")
        )),
    }
    frame.push_str(framing.agency);
    frame
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoachingEngine;

impl CoachingEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn build_prompt(&self, input: CoachingInput) -> CoachingPrompt {
        let framing = framing(input.tone);
        let action = mood_action(input.mood.unwrap_or(ConversationMood::Neutral), input.tone);

        let focus = if input.focus_areas.is_empty() {
            "general exploration".to_string()
        } else {
            input.focus_areas.join(", ")
        };
        let context = format!(
            "[Context]\nEmotional State: {}\nFocus Areas: {focus}\nTone: {}",
            input.mood.map_or("neutral", |m| m.as_str()),
            input.tone
        );
        let summary = key_insights(&input.reflection);
        let frame = action_frame(&input, &framing, action);
        let token_estimate =
            estimate_tokens(&[context.as_str(), summary.as_str(), frame.as_str(), framing.boundary].concat());

        CoachingPrompt {
            context,
            reflection: format!("[Reflection Summary]\n{summary}"),
            action_frame: format!("[Action Frame]\n{frame}"),
            boundaries: format!("[Boundaries]\n{}", framing.boundary),
            metadata: CoachingMetadata {
                tone: input.tone,
                mood: input.mood,
                focus_areas: input.focus_areas,
                token_estimate,
            },
        }
    }

    pub fn format(&self, prompt: &CoachingPrompt) -> String {
        format!(
            "{}\n\n{}\n\n{}\n\n{}\n\n[Metadata]\nTone: {}\nMood: {}\nFocus Areas: {}\nToken Estimate: {}",
            prompt.context,
            prompt.reflection,
            prompt.action_frame,
            prompt.boundaries,
            prompt.metadata.tone,
            prompt.metadata.mood.map_or("neutral", |m| m.as_str()),
            prompt.metadata.focus_areas.join(", "),
            prompt.metadata.token_estimate
        )
    }
}
