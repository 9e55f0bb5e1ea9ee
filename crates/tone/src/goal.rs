//! Goal suggestions derived from a reflection.

use serde::Serialize;
use solace_core::profile::{ConversationMood, TonePreference};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalDuration {
    Short,
    Medium,
    Long,
}

impl GoalDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalDuration::Short => "short",
            GoalDuration::Medium => "medium",
            GoalDuration::Long => "long",
        }
    }

    /// (minimum words, minimum confidence in tenths)
    fn thresholds(&self) -> (usize, u32) {
        match self {
            GoalDuration::Short => (50, 7),
            GoalDuration::Medium => (100, 8),
            GoalDuration::Long => (200, 9),
        }
    }
}

struct GoalFraming {
    prefix: &'static str,
    action: &'static str,
    duration: &'static str,
    boundary: &'static str,
}

fn framing(tone: TonePreference) -> GoalFraming {
    match tone {
        TonePreference::Supportive => GoalFraming {
            prefix: "You might consider",
            action: "exploring",
            duration: "at your own pace",
            boundary: "Remember, this is just a suggestion. You know what feels right for you.",
        },
        TonePreference::Direct => GoalFraming {
            prefix: "A potential goal could be",
            action: "implementing",
            duration: "this week",
            boundary: "This is one possible approach. Feel free to adjust it to better suit your needs.",
        },
        TonePreference::Curious => GoalFraming {
            prefix: "What if you tried",
            action: "experimenting with",
            duration: "over the next few days",
            boundary: "This is an invitation to explore. You're free to modify or decline as you see fit.",
        },
    }
}

/// Unknown focus areas use the work templates.
fn focus_template(focus_area: &str, duration: GoalDuration) -> &'static str {
    use GoalDuration as D;
    match (focus_area, duration) {
        ("relationships", D::Short) => "one interaction in your {action}",
        ("relationships", D::Medium) => "a pattern in your {action}",
        ("relationships", D::Long) => "the dynamics of your {action}",
        ("wellbeing", D::Short) => "one aspect of your {action}",
        ("wellbeing", D::Medium) => "your approach to {action}",
        ("wellbeing", D::Long) => "your overall {action} strategy",
        (_, D::Short) => "one small change in your {action}",
        (_, D::Medium) => "a specific aspect of your {action}",
        (_, D::Long) => "a comprehensive approach to {action}",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalInput {
    pub reflection: String,
    pub focus_area: String,
    pub tone: TonePreference,
    pub mood: Option<ConversationMood>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalMetadata {
    pub tone: TonePreference,
    pub mood: Option<ConversationMood>,
    pub duration: GoalDuration,
    pub confidence: f64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedGoal {
    pub id: String,
    pub content: String,
    pub focus_area: String,
    pub metadata: GoalMetadata,
}

/// Confidence in tenths so duration thresholds compare exactly.
fn confidence_tenths(input: &GoalInput, words: usize) -> u32 {
    let mut tenths = 5;
    if words > 100 {
        tenths += 2;
    } else if words > 50 {
        tenths += 1;
    }

    if !input.focus_area.is_empty() {
        let mentions = input
            .reflection
            .to_lowercase()
            .matches(&input.focus_area.to_lowercase())
            .count();
        tenths += mentions.min(2) as u32;
    }

    let r = &input.reflection;
    if input.tone == TonePreference::Direct && (r.contains("specific") || r.contains("clear")) {
        tenths += 1;
    }
    tenths.min(10)
}

fn estimate_duration(words: usize, tenths: u32) -> GoalDuration {
    [GoalDuration::Long, GoalDuration::Medium]
        .into_iter()
        .find(|d| {
            let (min_words, min_tenths) = d.thresholds();
            tenths >= min_tenths && words >= min_words
        })
        .unwrap_or(GoalDuration::Short)
}

fn extract_tags(reflection: &str, focus_area: &str) -> Vec<String> {
    let mut tags = vec![focus_area.to_string()];
    let rules: [(&[&str], &str); 3] = [
        (&["feel", "emotion"], "emotional awareness"),
        (&["think", "consider"], "cognitive"),
        (&["do", "action"], "behavioral"),
    ];
    for (needles, tag) in rules {
        if needles.iter().any(|n| reflection.contains(n)) && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn action_noun(reflection: &str) -> &'static str {
    if reflection.contains("improve") {
        "improvement"
    } else if reflection.contains("change") {
        "change"
    } else if reflection.contains("explore") {
        "exploration"
    } else {
        "development"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GoalEngine;

impl GoalEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn suggest(&self, input: GoalInput) -> SuggestedGoal {
        let words = input.reflection.split_whitespace().count();
        let tenths = confidence_tenths(&input, words);
        let duration = estimate_duration(words, tenths);
        let framing = framing(input.tone);

        let target = focus_template(&input.focus_area, duration)
            .replace("{action}", action_noun(&input.reflection));
        let content = format!(
            "{} {} {} {}. {}",
            framing.prefix, framing.action, target, framing.duration, framing.boundary
        );

        SuggestedGoal {
            id: Uuid::new_v4().to_string(),
            content,
            metadata: GoalMetadata {
                tone: input.tone,
                mood: input.mood,
                duration,
                confidence: f64::from(tenths) / 10.0,
                tags: extract_tags(&input.reflection, &input.focus_area),
            },
            focus_area: input.focus_area,
        }
    }

    pub fn format(&self, goal: &SuggestedGoal) -> String {
        format!(
            "[Suggested Goal]\n{}\n\n[Metadata]\nID: {}\nFocus Area: {}\nDuration: {}\nConfidence: {}%\nTags: {}",
            goal.content,
            goal.id,
            goal.focus_area,
            goal.metadata.duration.as_str(),
            (goal.metadata.confidence * 100.0).round() as i64,
            goal.metadata.tags.join(", ")
        )
    }
}
