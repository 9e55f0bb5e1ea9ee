//! Unified, read-only timeline of journal entries, mood samples and goals.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use solace_core::mood::{Goal, GoalStatus, Intensity, JournalEntry, JournalTone, Mood, MoodEntry};

const BREAKTHROUGH_SENTIMENT: f64 = 0.7;
const LOW_SENTIMENT: f64 = -0.5;
const STRONG_INTENSITY: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineTag {
    Milestone,
    Low,
    Breakthrough,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineKind {
    Mood {
        mood: Mood,
        intensity: Intensity,
    },
    Journal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tone: Option<JournalTone>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sentiment: Option<f64>,
    },
    Goal {
        title: String,
        status: GoalStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub timestamp: DateTime<Utc>,
    pub kind: TimelineKind,
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<TimelineTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

fn journal_item(entry: &JournalEntry) -> TimelineItem {
    let tag = entry.sentiment.and_then(|s| {
        if s > BREAKTHROUGH_SENTIMENT {
            Some(TimelineTag::Breakthrough)
        } else if s < LOW_SENTIMENT {
            Some(TimelineTag::Low)
        } else {
            None
        }
    });
    TimelineItem {
        timestamp: entry.timestamp,
        kind: TimelineKind::Journal {
            summary: entry.summary.clone(),
            tone: entry.tone,
            sentiment: entry.sentiment,
        },
        source_id: entry.id.clone(),
        tag,
        confidence: entry.sentiment.map(f64::abs),
    }
}

fn mood_item(entry: &MoodEntry) -> TimelineItem {
    let strong = entry.intensity.get() >= STRONG_INTENSITY;
    let tag = match entry.mood {
        Mood::Happy if strong => Some(TimelineTag::Breakthrough),
        Mood::Sad if strong => Some(TimelineTag::Low),
        _ => None,
    };
    TimelineItem {
        timestamp: entry.timestamp,
        kind: TimelineKind::Mood {
            mood: entry.mood,
            intensity: entry.intensity,
        },
        source_id: entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        tag,
        confidence: Some(entry.intensity.as_f64() / 5.0),
    }
}

fn goal_item(goal: &Goal) -> TimelineItem {
    TimelineItem {
        timestamp: goal.created_at,
        kind: TimelineKind::Goal {
            title: goal.title.clone(),
            status: goal.status,
        },
        source_id: goal.id.clone(),
        tag: (goal.status == GoalStatus::Completed).then_some(TimelineTag::Milestone),
        confidence: None,
    }
}

/// Merge all sources and sort by timestamp. Items with equal timestamps
/// keep source order: journal, then mood, then goal.
pub fn build_timeline(journal: &[JournalEntry], moods: &[MoodEntry], goals: &[Goal]) -> Vec<TimelineItem> {
    let mut items: Vec<TimelineItem> = journal
        .iter()
        .map(journal_item)
        .chain(moods.iter().map(mood_item))
        .chain(goals.iter().map(goal_item))
        .collect();
    items.sort_by_key(|i| i.timestamp);
    items
}
