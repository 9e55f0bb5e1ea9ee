//! Reflection prompts for journal sessions.
//!
//! A journal entry is scanned for emotion words, coarse sentiment, focus
//! areas and a depth score. The result picks a question set and is wrapped
//! in the tone's opening line.

use crate::microcopy;
use serde::Serialize;
use solace_core::profile::{ConversationMood, TonePreference};
use solace_core::token::estimate_tokens;
use tracing::debug;

const EMOTION_STEMS: &[&str] = &[
    "feel", "emotion", "mood", "happy", "sad", "angry", "anxious", "excited", "worried",
];
const POSITIVE_STEMS: &[&str] = &["happy", "good", "great", "excellent", "positive", "success"];
const NEGATIVE_STEMS: &[&str] = &["sad", "bad", "difficult", "hard", "struggle", "negative"];
const INTROSPECTION_STEMS: &[&str] = &[
    "feel",
    "think",
    "believe",
    "understand",
    "realize",
    "experience",
    "reflect",
];

const CLOSING: &str =
    "Take your time to reflect on these questions. There are no right or wrong answers.";
const MAX_FOCUS_AREAS: usize = 3;
const FOCUS_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    Work,
    Relationships,
    Wellbeing,
    Identity,
    Goals,
    Creativity,
}

struct FocusPatterns {
    keywords: &'static [&'static str],
    phrases: &'static [&'static str],
    semantic: &'static [&'static str],
}

impl FocusArea {
    pub const ALL: [FocusArea; 6] = [
        FocusArea::Work,
        FocusArea::Relationships,
        FocusArea::Wellbeing,
        FocusArea::Identity,
        FocusArea::Goals,
        FocusArea::Creativity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FocusArea::Work => "work",
            FocusArea::Relationships => "relationships",
            FocusArea::Wellbeing => "wellbeing",
            FocusArea::Identity => "identity",
            FocusArea::Goals => "goals",
            FocusArea::Creativity => "creativity",
        }
    }

    fn patterns(&self) -> FocusPatterns {
        match self {
            FocusArea::Work => FocusPatterns {
                keywords: &[
                    "work", "job", "career", "project", "meeting", "deadline", "boss",
                    "colleague", "promotion", "salary",
                ],
                phrases: &[
                    "at work", "in the office", "workplace", "professional", "business",
                    "team", "company", "industry",
                ],
                semantic: &[
                    "professional growth",
                    "career development",
                    "work performance",
                    "job satisfaction",
                ],
            },
            FocusArea::Relationships => FocusPatterns {
                keywords: &[
                    "friend", "family", "partner", "relationship", "love", "dating",
                    "marriage", "parent", "child", "sibling",
                ],
                phrases: &[
                    "my partner", "my family", "my friends", "social life", "personal life",
                    "close to", "connected to",
                ],
                semantic: &[
                    "interpersonal dynamics",
                    "social connections",
                    "relationship quality",
                    "emotional bonds",
                ],
            },
            FocusArea::Wellbeing => FocusPatterns {
                keywords: &[
                    "health", "fitness", "exercise", "diet", "sleep", "stress", "anxiety",
                    "depression", "mental", "physical",
                ],
                phrases: &[
                    "my health", "wellbeing", "self care", "taking care", "feeling good",
                    "feeling bad", "mental health",
                ],
                semantic: &[
                    "health habits",
                    "self-care practices",
                    "wellness routine",
                    "mental wellbeing",
                ],
            },
            FocusArea::Identity => FocusPatterns {
                keywords: &[
                    "identity", "self", "who i am", "values", "beliefs", "purpose", "meaning",
                    "authentic", "true self",
                ],
                phrases: &[
                    "my identity", "who i am", "my values", "my beliefs", "my purpose",
                    "my meaning", "being authentic",
                ],
                semantic: &[
                    "self-concept",
                    "personal identity",
                    "core values",
                    "life purpose",
                ],
            },
            FocusArea::Goals => FocusPatterns {
                keywords: &[
                    "goal", "plan", "future", "dream", "aspiration", "ambition", "achievement",
                    "success", "progress",
                ],
                phrases: &[
                    "my goals", "my plans", "my future", "my dreams", "my aspirations",
                    "my ambitions", "my achievements",
                ],
                semantic: &[
                    "goal setting",
                    "future planning",
                    "personal growth",
                    "achievement orientation",
                ],
            },
            FocusArea::Creativity => FocusPatterns {
                keywords: &[
                    "creative", "art", "music", "writing", "design", "project", "idea",
                    "inspiration", "expression",
                ],
                phrases: &[
                    "my art", "my music", "my writing", "my design", "my project", "my ideas",
                    "my inspiration",
                ],
                semantic: &[
                    "creative expression",
                    "artistic process",
                    "creative flow",
                    "inspiration",
                ],
            },
        }
    }

    fn follow_up(&self) -> Option<&'static str> {
        match self {
            FocusArea::Work => Some("How does this relate to your professional growth?"),
            FocusArea::Relationships => {
                Some("What does this reveal about your connections with others?")
            }
            FocusArea::Goals => Some("How might this influence your future plans?"),
            FocusArea::Wellbeing => Some("What impact might this have on your overall wellbeing?"),
            FocusArea::Identity | FocusArea::Creativity => None,
        }
    }
}

impl std::fmt::Display for FocusArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionDepth {
    Surface,
    Moderate,
    Deep,
}

impl ReflectionDepth {
    fn from_score(score: f64) -> Self {
        if score > 0.7 {
            ReflectionDepth::Deep
        } else if score > 0.4 {
            ReflectionDepth::Moderate
        } else {
            ReflectionDepth::Surface
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReflectionDepth::Surface => "surface",
            ReflectionDepth::Moderate => "moderate",
            ReflectionDepth::Deep => "deep",
        }
    }

    fn questions(&self) -> [&'static str; 3] {
        match self {
            ReflectionDepth::Surface => [
                "What stood out to you in this experience?",
                "How did you feel in the moment?",
                "What was most noticeable about this situation?",
            ],
            ReflectionDepth::Moderate => [
                "What patterns do you notice in how you're responding?",
                "How does this connect to other experiences?",
                "What insights are emerging for you?",
            ],
            ReflectionDepth::Deep => [
                "What deeper meaning might this hold for you?",
                "How might this experience contribute to your growth?",
                "What transformation might be possible here?",
            ],
        }
    }
}

/// What the scan of a journal entry found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryAnalysis {
    pub emotions: Vec<String>,
    pub depth: ReflectionDepth,
    pub focus_areas: Vec<FocusArea>,
    pub sentiment: Sentiment,
    pub depth_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReflectionMetadata {
    pub tone: TonePreference,
    pub mood: Option<ConversationMood>,
    pub sentiment: Sentiment,
    pub depth_score: f64,
    pub focus_areas: Vec<FocusArea>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReflectionPrompt {
    pub opening: String,
    pub context: String,
    pub questions: Vec<String>,
    pub closing: String,
    pub metadata: ReflectionMetadata,
}

fn contains_any(word: &str, stems: &[&str]) -> bool {
    stems.iter().any(|s| word.contains(s))
}

fn percent(score: f64) -> i64 {
    (score * 100.0).round() as i64
}

/// Up to three focus areas, strongest first.
pub fn detect_focus_areas(entry: &str) -> Vec<FocusArea> {
    let lower = entry.to_lowercase();
    let count = |list: &[&str]| list.iter().filter(|p| lower.contains(*p)).count() as f64;

    let mut scored: Vec<(FocusArea, f64)> = FocusArea::ALL
        .iter()
        .map(|area| {
            let p = area.patterns();
            let confidence =
                count(p.keywords) * 0.4 + count(p.phrases) * 0.4 + count(p.semantic) * 0.2;
            (*area, confidence)
        })
        .filter(|(_, confidence)| *confidence > FOCUS_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(MAX_FOCUS_AREAS);
    scored.into_iter().map(|(area, _)| area).collect()
}

/// Length, vocabulary complexity and introspective language, capped at 1.
pub fn depth_score(entry: &str) -> f64 {
    let words: Vec<&str> = entry.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }
    let n = words.len() as f64;
    let complex = words.iter().filter(|w| w.chars().count() > 6).count() as f64;
    let introspective = words
        .iter()
        .filter(|w| contains_any(&w.to_lowercase(), INTROSPECTION_STEMS))
        .count() as f64;

    let score = (n / 500.0).min(0.3) + (complex / n).min(0.3) + (introspective / n * 2.0).min(0.4);
    score.min(1.0)
}

pub fn analyze_entry(entry: &str) -> EntryAnalysis {
    let lower = entry.to_lowercase();
    let mut emotions: Vec<String> = Vec::new();
    let mut sentiment = Sentiment::Neutral;

    for word in lower.split_whitespace() {
        if contains_any(word, EMOTION_STEMS) && !emotions.iter().any(|e| e == word) {
            emotions.push(word.to_string());
        }
        if contains_any(word, POSITIVE_STEMS) {
            sentiment = Sentiment::Positive;
        } else if contains_any(word, NEGATIVE_STEMS) {
            sentiment = Sentiment::Negative;
        }
    }

    let depth_score = depth_score(entry);
    EntryAnalysis {
        emotions,
        depth: ReflectionDepth::from_score(depth_score),
        focus_areas: detect_focus_areas(entry),
        sentiment,
        depth_score,
    }
}

fn context_block(analysis: &EntryAnalysis) -> String {
    let emotions = if analysis.emotions.is_empty() {
        "neutral".to_string()
    } else {
        analysis.emotions.join(", ")
    };
    let focus = if analysis.focus_areas.is_empty() {
        "general".to_string()
    } else {
        analysis
            .focus_areas
            .iter()
            .map(FocusArea::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Emotional Context: {emotions}\nReflection Depth: {} ({}%)\nFocus Areas: {focus}\nSentiment: {}",
        analysis.depth.as_str(),
        percent(analysis.depth_score),
        analysis.sentiment.as_str()
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReflectionEngine;

impl ReflectionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn build_prompt(
        &self,
        entry: &str,
        mood: Option<ConversationMood>,
        tone: TonePreference,
    ) -> ReflectionPrompt {
        let analysis = analyze_entry(entry);
        let copy = microcopy::select(tone, mood);

        let questions = analysis
            .depth
            .questions()
            .into_iter()
            .chain(analysis.focus_areas.iter().filter_map(FocusArea::follow_up))
            .map(String::from)
            .collect();

        ReflectionPrompt {
            opening: copy.opening.to_string(),
            context: context_block(&analysis),
            questions,
            closing: CLOSING.to_string(),
            metadata: ReflectionMetadata {
                tone,
                mood,
                sentiment: analysis.sentiment,
                depth_score: analysis.depth_score,
                focus_areas: analysis.focus_areas,
            },
        }
    }

    pub fn format(&self, prompt: &ReflectionPrompt) -> String {
        let questions = prompt
            .questions
            .iter()
            .map(|q| format!("- {q}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{opening}\n\n{context}\n\nLet's explore this together. Consider these questions:\n{questions}\n\n{closing}\n\n[Metadata]\nTone: {tone}\nMood: {mood}\nSentiment: {sentiment}\nDepth Score: {depth}%",
            opening = prompt.opening,
            context = prompt.context,
            closing = prompt.closing,
            tone = prompt.metadata.tone,
            mood = prompt.metadata.mood.map_or("neutral", |m| m.as_str()),
            sentiment = prompt.metadata.sentiment.as_str(),
            depth = percent(prompt.metadata.depth_score),
        )
    }

    pub fn estimate_tokens(&self, prompt: &ReflectionPrompt) -> usize {
        let tokens = estimate_tokens(&self.format(prompt));
        debug!(tokens, "Reflection prompt token usage");
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_work_and_relationships() {
        let areas = detect_focus_areas(
            "My boss moved the deadline again and my partner says I bring work home.",
        );
        assert_eq!(areas.first(), Some(&FocusArea::Work));
        assert!(areas.contains(&FocusArea::Relationships));
        assert!(areas.len() <= 3);
    }

    #[test]
    fn no_focus_for_plain_text() {
        assert!(detect_focus_areas("Nothing much today.").is_empty());
    }

    #[test]
    fn sentiment_takes_last_signal() {
        assert_eq!(analyze_entry("a good start").sentiment, Sentiment::Positive);
        assert_eq!(
            analyze_entry("a good start but a hard finish").sentiment,
            Sentiment::Negative
        );
        assert_eq!(analyze_entry("just a day").sentiment, Sentiment::Neutral);
    }

    #[test]
    fn emotions_are_deduplicated() {
        let a = analyze_entry("I feel tired and I feel worried");
        assert_eq!(a.emotions, vec!["feel".to_string(), "worried".to_string()]);
    }

    #[test]
    fn depth_score_bounds() {
        assert_eq!(depth_score(""), 0.0);
        let deep = "I realize I understand and reflect on experiences differently".repeat(40);
        let score = depth_score(&deep);
        assert!(score > 0.4 && score <= 1.0);
    }

    #[test]
    fn prompt_uses_depth_questions_and_focus_follow_ups() {
        let engine = ReflectionEngine::new();
        let prompt = engine.build_prompt(
            "The project meeting went badly.",
            Some(ConversationMood::Sad),
            TonePreference::Supportive,
        );
        assert!(prompt.opening.starts_with("I hear your sadness"));
        assert_eq!(prompt.questions[0], "What stood out to you in this experience?");
        assert!(
            prompt
                .questions
                .contains(&"How does this relate to your professional growth?".to_string())
        );
        assert!(prompt.context.contains("Focus Areas: work"));
    }

    #[test]
    fn formatted_prompt_has_metadata_block() {
        let engine = ReflectionEngine::new();
        let prompt = engine.build_prompt("A quiet walk.", None, TonePreference::Curious);
        let text = engine.format(&prompt);
        assert!(text.starts_with("What would you like to explore together?"));
        assert!(text.contains("[Metadata]\nTone: curious\nMood: neutral"));
        assert_eq!(engine.estimate_tokens(&prompt), text.chars().count().div_ceil(4));
    }
}
