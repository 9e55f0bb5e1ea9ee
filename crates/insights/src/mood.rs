//! Weekly mood pattern analysis.
//!
//! Entries are grouped into Sunday-aligned UTC calendar weeks. Each week
//! gets a distribution, a dominant mood, volatility of the weighted mood
//! value, run-length and stability trends, a simple cycle detector,
//! outliers beyond two standard deviations and an improvement flag.

use crate::stats::{mean, population_std_dev};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use solace_core::mood::{Mood, MoodEntry};
use std::collections::BTreeMap;
use tracing::debug;

/// Fewer entries than this leave `improvement` undefined.
const MIN_ENTRIES_FOR_IMPROVEMENT: usize = 7;
const MAX_CYCLE_LENGTH: usize = 7;

/// An inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodRange {
    /// The Sunday-aligned week containing `date`.
    pub fn week_of(date: NaiveDate) -> Self {
        let start = date - Duration::days(i64::from(date.weekday().num_days_from_sunday()));
        Self {
            start,
            end: start + Duration::days(6),
        }
    }
}

impl std::fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodTrends {
    pub streak: usize,
    pub stability: f64,
    pub cycle_length: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignificantEvents {
    pub dips: Vec<MoodEntry>,
    pub spikes: Vec<MoodEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDetails {
    pub average_intensity: f64,
    /// Fraction of entries per mood; every mood is present.
    pub mood_distribution: BTreeMap<Mood, f64>,
    pub significant_events: SignificantEvents,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodPattern {
    pub period: PeriodRange,
    pub dominant_mood: Mood,
    pub volatility: f64,
    pub improvement: Option<bool>,
    pub trends: MoodTrends,
    pub details: PatternDetails,
}

/// One pattern per week present in `entries`, oldest week first.
pub fn analyze(entries: &[MoodEntry]) -> Vec<MoodPattern> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| e.timestamp);

    let mut weeks: Vec<(PeriodRange, Vec<MoodEntry>)> = Vec::new();
    for entry in sorted {
        let week = PeriodRange::week_of(entry.timestamp.date_naive());
        match weeks.last_mut() {
            Some((current, bucket)) if *current == week => bucket.push(entry),
            _ => weeks.push((week, vec![entry])),
        }
    }

    let patterns: Vec<MoodPattern> = weeks
        .into_iter()
        .map(|(period, bucket)| analyze_period(period, &bucket))
        .collect();
    debug!(entries = entries.len(), periods = patterns.len(), "Mood history analyzed");
    patterns
}

fn analyze_period(period: PeriodRange, entries: &[MoodEntry]) -> MoodPattern {
    let values: Vec<f64> = entries.iter().map(MoodEntry::weighted_value).collect();
    let moods: Vec<Mood> = entries.iter().map(|e| e.mood).collect();
    let distribution = mood_distribution(&moods);

    MoodPattern {
        period,
        dominant_mood: dominant_mood(&moods),
        volatility: population_std_dev(&values),
        improvement: improvement(&values),
        trends: MoodTrends {
            streak: longest_streak(&moods),
            stability: stability(&moods),
            cycle_length: cycle_length(&moods),
        },
        details: PatternDetails {
            average_intensity: mean(
                &entries.iter().map(|e| e.intensity.as_f64()).collect::<Vec<_>>(),
            ),
            mood_distribution: distribution,
            significant_events: significant_events(entries, &values),
        },
    }
}

pub(crate) fn mood_counts(moods: &[Mood]) -> BTreeMap<Mood, usize> {
    let mut counts: BTreeMap<Mood, usize> = Mood::ALL.iter().map(|m| (*m, 0)).collect();
    for m in moods {
        *counts.entry(*m).or_default() += 1;
    }
    counts
}

fn mood_distribution(moods: &[Mood]) -> BTreeMap<Mood, f64> {
    let n = moods.len().max(1) as f64;
    mood_counts(moods)
        .into_iter()
        .map(|(m, c)| (m, c as f64 / n))
        .collect()
}

/// Highest count wins; ties go to the mood declared first.
pub(crate) fn dominant_mood(moods: &[Mood]) -> Mood {
    let counts = mood_counts(moods);
    let mut best = Mood::Neutral;
    let mut best_count = 0;
    for m in Mood::ALL {
        let c = counts.get(&m).copied().unwrap_or(0);
        if c > best_count {
            best = m;
            best_count = c;
        }
    }
    best
}

fn longest_streak(moods: &[Mood]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut prev: Option<Mood> = None;
    for m in moods {
        current = if prev == Some(*m) { current + 1 } else { 1 };
        longest = longest.max(current);
        prev = Some(*m);
    }
    longest
}

fn stability(moods: &[Mood]) -> f64 {
    if moods.len() < 2 {
        return 1.0;
    }
    let changes = moods.windows(2).filter(|w| w[0] != w[1]).count();
    1.0 - changes as f64 / (moods.len() - 1) as f64
}

fn cycle_length(moods: &[Mood]) -> Option<usize> {
    let max_k = MAX_CYCLE_LENGTH.min(moods.len() / 2);
    (2..=max_k).find(|&k| (0..moods.len() - k).all(|i| moods[i] == moods[i + k]))
}

fn significant_events(entries: &[MoodEntry], values: &[f64]) -> SignificantEvents {
    let m = mean(values);
    let sd = population_std_dev(values);
    let mut events = SignificantEvents::default();
    for (entry, v) in entries.iter().zip(values) {
        if *v < m - 2.0 * sd {
            events.dips.push(entry.clone());
        } else if *v > m + 2.0 * sd {
            events.spikes.push(entry.clone());
        }
    }
    events
}

fn improvement(values: &[f64]) -> Option<bool> {
    if values.len() < MIN_ENTRIES_FOR_IMPROVEMENT {
        return None;
    }
    let (first, second) = values.split_at(values.len() / 2);
    Some(mean(second) > mean(first))
}
