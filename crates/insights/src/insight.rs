//! Aggregate insight summary over mood samples, journal entries, goals and
//! the derived timeline.

use crate::mood::{dominant_mood, mood_counts};
use crate::stats::{mean, population_std_dev};
use crate::timeline::{TimelineItem, TimelineTag};
use serde::{Serialize, Serializer};
use solace_core::mood::{Goal, GoalStatus, JournalEntry, JournalTone, Mood, MoodEntry};
use tracing::debug;

const TREND_THRESHOLD: f64 = 0.5;
const DEPTH_TREND_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthTrend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodTrend {
    pub mood: Mood,
    pub frequency: f64,
    pub average_intensity: f64,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodStats {
    pub trends: Vec<MoodTrend>,
    pub average_mood: f64,
    pub volatility: f64,
    pub dominant_mood: Mood,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToneUsage {
    pub tone: JournalTone,
    pub usage: f64,
    pub effectiveness: f64,
}

fn serialize_seconds<S: Serializer>(d: &chrono::Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_seconds())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalStats {
    pub completed: usize,
    pub active: usize,
    pub archived: usize,
    pub completion_rate: f64,
    #[serde(serialize_with = "serialize_seconds")]
    pub average_completion_time: chrono::Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DepthByCategory {
    pub emotional: f64,
    pub analytical: f64,
    pub reflective: f64,
}

impl DepthByCategory {
    fn overall(&self) -> f64 {
        self.emotional * 0.4 + self.analytical * 0.3 + self.reflective * 0.3
    }

    fn mean(&self) -> f64 {
        (self.emotional + self.analytical + self.reflective) / 3.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthScore {
    pub overall: f64,
    pub by_category: DepthByCategory,
    pub trend: DepthTrend,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimelineHighlights {
    pub milestones: usize,
    pub breakthroughs: usize,
    pub lows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightSummary {
    pub mood_stats: MoodStats,
    pub tone_profile: Vec<ToneUsage>,
    pub goal_stats: GoalStats,
    pub depth_score: DepthScore,
    pub timeline_highlights: TimelineHighlights,
}

pub fn build_insight_summary(
    timeline: &[TimelineItem],
    moods: &[MoodEntry],
    journal: &[JournalEntry],
    goals: &[Goal],
) -> InsightSummary {
    let summary = InsightSummary {
        mood_stats: mood_stats(moods),
        tone_profile: tone_profile(journal),
        goal_stats: goal_stats(goals),
        depth_score: depth_score(journal),
        timeline_highlights: highlights(timeline),
    };
    debug!(
        moods = moods.len(),
        journal = journal.len(),
        goals = goals.len(),
        "Insight summary built"
    );
    summary
}

fn mood_stats(moods: &[MoodEntry]) -> MoodStats {
    let all: Vec<Mood> = moods.iter().map(|e| e.mood).collect();
    let counts = mood_counts(&all);
    let total = moods.len() as f64;
    // Trends read first and last by time, whatever order the caller used.
    let mut chronological: Vec<&MoodEntry> = moods.iter().collect();
    chronological.sort_by_key(|e| e.timestamp);

    let trends = Mood::ALL
        .iter()
        .filter_map(|mood| {
            let count = counts.get(mood).copied().unwrap_or(0);
            if count == 0 {
                return None;
            }
            let intensities: Vec<f64> = chronological
                .iter()
                .filter(|e| e.mood == *mood)
                .map(|e| e.intensity.as_f64())
                .collect();
            Some(MoodTrend {
                mood: *mood,
                frequency: count as f64 / total,
                average_intensity: mean(&intensities),
                trend: intensity_trend(&intensities),
            })
        })
        .collect();

    let intensities: Vec<f64> = moods.iter().map(|e| e.intensity.as_f64()).collect();
    MoodStats {
        trends,
        average_mood: mean(&intensities),
        volatility: population_std_dev(&intensities),
        dominant_mood: dominant_mood(&all),
    }
}

fn intensity_trend(intensities: &[f64]) -> TrendDirection {
    match (intensities.first(), intensities.last()) {
        (Some(first), Some(last)) if intensities.len() >= 2 => {
            let delta = last - first;
            if delta > TREND_THRESHOLD {
                TrendDirection::Increasing
            } else if delta < -TREND_THRESHOLD {
                TrendDirection::Decreasing
            } else {
                TrendDirection::Stable
            }
        }
        _ => TrendDirection::Stable,
    }
}

fn tone_profile(journal: &[JournalEntry]) -> Vec<ToneUsage> {
    let total = journal.len() as f64;
    [
        JournalTone::Professional,
        JournalTone::Friendly,
        JournalTone::Empathetic,
        JournalTone::Casual,
    ]
    .into_iter()
    .filter_map(|tone| {
        let sentiments: Vec<f64> = journal
            .iter()
            .filter(|e| e.tone == Some(tone))
            .map(|e| e.sentiment.unwrap_or(0.0))
            .collect();
        (!sentiments.is_empty()).then(|| ToneUsage {
            tone,
            usage: sentiments.len() as f64 / total,
            effectiveness: mean(&sentiments),
        })
    })
    .collect()
}

fn goal_stats(goals: &[Goal]) -> GoalStats {
    let count = |status: GoalStatus| goals.iter().filter(|g| g.status == status).count();
    let completed: Vec<&Goal> = goals
        .iter()
        .filter(|g| g.status == GoalStatus::Completed)
        .collect();

    let average_completion_time = if completed.is_empty() {
        chrono::Duration::zero()
    } else {
        let total_ms: i64 = completed
            .iter()
            .map(|g| (g.updated_at - g.created_at).num_milliseconds())
            .sum();
        chrono::Duration::milliseconds(total_ms / completed.len() as i64)
    };

    GoalStats {
        completed: completed.len(),
        active: count(GoalStatus::Active),
        archived: count(GoalStatus::Archived),
        completion_rate: if goals.is_empty() {
            0.0
        } else {
            completed.len() as f64 / goals.len() as f64
        },
        average_completion_time,
    }
}

fn entry_depth(entry: &JournalEntry) -> DepthByCategory {
    let words = entry.content.split_whitespace().count() as f64;
    DepthByCategory {
        emotional: entry.sentiment.map(f64::abs).unwrap_or(0.0),
        analytical: (words / 100.0).min(1.0),
        reflective: if entry.tone == Some(JournalTone::Empathetic) {
            0.8
        } else {
            0.5
        },
    }
}

fn depth_score(journal: &[JournalEntry]) -> DepthScore {
    if journal.is_empty() {
        return DepthScore {
            overall: 0.0,
            by_category: DepthByCategory::default(),
            trend: DepthTrend::Stable,
        };
    }

    let mut chronological: Vec<&JournalEntry> = journal.iter().collect();
    chronological.sort_by_key(|e| e.timestamp);
    let scores: Vec<DepthByCategory> = chronological.into_iter().map(entry_depth).collect();
    let by_category = DepthByCategory {
        emotional: mean(&scores.iter().map(|s| s.emotional).collect::<Vec<_>>()),
        analytical: mean(&scores.iter().map(|s| s.analytical).collect::<Vec<_>>()),
        reflective: mean(&scores.iter().map(|s| s.reflective).collect::<Vec<_>>()),
    };

    DepthScore {
        overall: by_category.overall(),
        by_category,
        trend: depth_trend(&scores),
    }
}

fn depth_trend(scores: &[DepthByCategory]) -> DepthTrend {
    if scores.len() < 2 {
        return DepthTrend::Stable;
    }
    let per_entry: Vec<f64> = scores.iter().map(DepthByCategory::mean).collect();
    let (first, second) = per_entry.split_at(per_entry.len() / 2);
    let difference = mean(second) - mean(first);
    if difference > DEPTH_TREND_THRESHOLD {
        DepthTrend::Improving
    } else if difference < -DEPTH_TREND_THRESHOLD {
        DepthTrend::Declining
    } else {
        DepthTrend::Stable
    }
}

fn highlights(timeline: &[TimelineItem]) -> TimelineHighlights {
    timeline
        .iter()
        .fold(TimelineHighlights::default(), |mut acc, item| {
            match item.tag {
                Some(TimelineTag::Milestone) => acc.milestones += 1,
                Some(TimelineTag::Breakthrough) => acc.breakthroughs += 1,
                Some(TimelineTag::Low) => acc.lows += 1,
                None => {}
            }
            acc
        })
}
