//! Chart-ready views of weekly mood patterns.
//!
//! Each [`MoodPattern`] becomes a distribution slice list, a trend line of
//! its significant events, an hour-by-weekday heatmap of those events and a
//! short narrative with detected patterns and recommendations.

use crate::mood::{MoodPattern, PeriodRange};
use chrono::{Datelike, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use solace_core::mood::{Mood, MoodEntry};

const HIGH_VOLATILITY: f64 = 0.6;
const MODERATE_VOLATILITY: f64 = 0.3;
const NOTABLE_STREAK: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSlice {
    pub mood: Mood,
    /// Rounded share of the period's entries, 1..=100.
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    /// Short weekday name, e.g. `Tue`.
    pub day: String,
    /// UTC hour of day.
    pub hour: u32,
    pub intensity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodCharts {
    pub distribution: Vec<DistributionSlice>,
    pub trend: Vec<TrendPoint>,
    pub heatmap: Vec<HeatmapCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInsights {
    pub summary: String,
    pub patterns: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodVisualization {
    pub period: PeriodRange,
    pub charts: MoodCharts,
    pub insights: PatternInsights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    fn of(hour: u32) -> Self {
        match hour {
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }
}

/// One visualization per pattern, in the same order.
pub fn visualize(patterns: &[MoodPattern]) -> Vec<MoodVisualization> {
    patterns.iter().map(visualize_pattern).collect()
}

/// Average intensity per period, dated at the period start.
pub fn period_average_series(patterns: &[MoodPattern]) -> Vec<TrendPoint> {
    patterns
        .iter()
        .map(|p| TrendPoint {
            date: p.period.start,
            value: p.details.average_intensity,
        })
        .collect()
}

fn visualize_pattern(pattern: &MoodPattern) -> MoodVisualization {
    let events = significant_events(pattern);

    let distribution = pattern
        .details
        .mood_distribution
        .iter()
        .map(|(mood, fraction)| DistributionSlice {
            mood: *mood,
            percentage: (fraction * 100.0).round() as u32,
        })
        .filter(|slice| slice.percentage > 0)
        .collect();

    let mut trend: Vec<TrendPoint> = events
        .iter()
        .map(|e| TrendPoint {
            date: e.timestamp.date_naive(),
            value: e.weighted_value(),
        })
        .collect();
    trend.sort_by_key(|p| p.date);

    let heatmap = events
        .iter()
        .map(|e| HeatmapCell {
            day: e.timestamp.weekday().to_string(),
            hour: e.timestamp.hour(),
            intensity: e.intensity.get(),
        })
        .collect();

    MoodVisualization {
        period: pattern.period,
        charts: MoodCharts {
            distribution,
            trend,
            heatmap,
        },
        insights: insights(pattern, &events),
    }
}

fn significant_events(pattern: &MoodPattern) -> Vec<&MoodEntry> {
    let events = &pattern.details.significant_events;
    events.dips.iter().chain(events.spikes.iter()).collect()
}

fn insights(pattern: &MoodPattern, events: &[&MoodEntry]) -> PatternInsights {
    let busiest = busiest_time_of_day(events);
    let patterns = detected_patterns(pattern, busiest);
    PatternInsights {
        summary: summary(pattern),
        patterns,
        recommendations: recommendations(pattern, busiest),
    }
}

fn summary(pattern: &MoodPattern) -> String {
    let mut parts = vec![format!(
        "During this period, your dominant mood was {}.",
        pattern.dominant_mood
    )];

    parts.push(
        if pattern.volatility > HIGH_VOLATILITY {
            "Your mood showed significant variation."
        } else if pattern.volatility > MODERATE_VOLATILITY {
            "Your mood was moderately stable."
        } else {
            "Your mood remained relatively stable."
        }
        .to_string(),
    );

    match pattern.improvement {
        Some(true) => parts.push("There was an overall improvement in your mood.".into()),
        Some(false) => parts.push("Your mood showed a declining trend.".into()),
        None => {}
    }

    if pattern.trends.streak > NOTABLE_STREAK {
        parts.push(format!(
            "You maintained the same mood for {} consecutive entries.",
            pattern.trends.streak
        ));
    }
    if let Some(cycle) = pattern.trends.cycle_length {
        parts.push(format!("A mood cycle of {cycle} entries was detected."));
    }

    parts.join(" ")
}

/// The time of day holding strictly more significant events than either
/// of the others.
fn busiest_time_of_day(events: &[&MoodEntry]) -> Option<TimeOfDay> {
    let count = |slot: TimeOfDay| {
        events
            .iter()
            .filter(|e| TimeOfDay::of(e.timestamp.hour()) == slot)
            .count()
    };
    let (morning, afternoon, evening) = (
        count(TimeOfDay::Morning),
        count(TimeOfDay::Afternoon),
        count(TimeOfDay::Evening),
    );

    if morning > afternoon && morning > evening {
        Some(TimeOfDay::Morning)
    } else if afternoon > morning && afternoon > evening {
        Some(TimeOfDay::Afternoon)
    } else if evening > morning && evening > afternoon {
        Some(TimeOfDay::Evening)
    } else {
        None
    }
}

fn detected_patterns(pattern: &MoodPattern, busiest: Option<TimeOfDay>) -> Vec<String> {
    let mut found = Vec::new();
    match busiest {
        Some(TimeOfDay::Morning) => found.push("More mood events in the morning"),
        Some(TimeOfDay::Afternoon) => found.push("More mood events in the afternoon"),
        Some(TimeOfDay::Evening) => found.push("More mood events in the evening"),
        None => {}
    }

    let intensity = pattern.details.average_intensity;
    if intensity > 4.0 {
        found.push("High intensity mood entries");
    } else if intensity < 2.0 {
        found.push("Low intensity mood entries");
    }

    let stability = pattern.trends.stability;
    if stability > 0.8 {
        found.push("Very stable mood pattern");
    } else if stability < 0.3 {
        found.push("Frequent mood changes");
    }

    found.into_iter().map(String::from).collect()
}

fn recommendations(pattern: &MoodPattern, busiest: Option<TimeOfDay>) -> Vec<String> {
    let mut out: Vec<&str> = Vec::new();
    if pattern.volatility > HIGH_VOLATILITY {
        out.extend([
            "Consider practicing mindfulness to help stabilize your mood",
            "Try to identify triggers for mood changes",
        ]);
    }
    match busiest {
        Some(TimeOfDay::Morning) => out.extend([
            "Start your day with a calming routine",
            "Consider morning meditation or exercise",
        ]),
        Some(TimeOfDay::Evening) => out.extend([
            "Establish a relaxing evening routine",
            "Try journaling before bed to process the day",
        ]),
        _ => {}
    }
    if pattern.improvement == Some(false) {
        out.extend([
            "Focus on small, positive changes each day",
            "Consider discussing mood patterns with a professional",
        ]);
    }
    out.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::analyze;
    use chrono::{TimeZone, Utc};

    // 2024-03-03 is a Sunday, so days 3..=9 share one week.
    fn entry(day: u32, hour: u32, mood: Mood, intensity: u8) -> MoodEntry {
        MoodEntry::new(
            Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
            mood,
            intensity,
        )
        .unwrap()
    }

    fn alternating_week() -> Vec<MoodEntry> {
        (3..=9)
            .map(|day| {
                let mood = if day % 2 == 1 { Mood::Happy } else { Mood::Sad };
                entry(day, 12, mood, 5)
            })
            .collect()
    }

    #[test]
    fn one_visualization_per_pattern() {
        let patterns = analyze(&alternating_week());
        let views = visualize(&patterns);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].period, patterns[0].period);
        assert!(visualize(&[]).is_empty());
    }

    #[test]
    fn distribution_drops_empty_moods() {
        let views = visualize(&analyze(&alternating_week()));
        assert_eq!(
            views[0].charts.distribution,
            vec![
                DistributionSlice { mood: Mood::Happy, percentage: 57 },
                DistributionSlice { mood: Mood::Sad, percentage: 43 },
            ]
        );
    }

    #[test]
    fn volatile_declining_week() {
        let views = visualize(&analyze(&alternating_week()));
        let insights = &views[0].insights;

        assert_eq!(
            insights.summary,
            "During this period, your dominant mood was happy. \
             Your mood showed significant variation. \
             Your mood showed a declining trend. \
             A mood cycle of 2 entries was detected."
        );
        assert!(insights.patterns.contains(&"Frequent mood changes".to_string()));
        assert!(insights.recommendations.contains(
            &"Consider practicing mindfulness to help stabilize your mood".to_string()
        ));
        assert!(insights
            .recommendations
            .contains(&"Focus on small, positive changes each day".to_string()));
        // No outliers beyond two standard deviations.
        assert!(views[0].charts.trend.is_empty());
        assert!(views[0].charts.heatmap.is_empty());
    }

    #[test]
    fn morning_spike_is_charted_and_named() {
        let mut entries: Vec<MoodEntry> = [3, 4, 6, 7, 8, 9]
            .into_iter()
            .map(|day| entry(day, 15, Mood::Calm, 3))
            .collect();
        entries.push(entry(5, 9, Mood::Happy, 5));

        let views = visualize(&analyze(&entries));
        let charts = &views[0].charts;
        assert_eq!(
            charts.heatmap,
            vec![HeatmapCell { day: "Tue".into(), hour: 9, intensity: 5 }]
        );
        assert_eq!(charts.trend.len(), 1);
        assert_eq!(charts.trend[0].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert!((charts.trend[0].value - 5.0).abs() < 1e-9);

        let insights = &views[0].insights;
        assert!(insights.patterns.contains(&"More mood events in the morning".to_string()));
        assert!(insights
            .recommendations
            .contains(&"Start your day with a calming routine".to_string()));
    }

    #[test]
    fn quiet_single_entry_summary() {
        let views = visualize(&analyze(&[entry(4, 20, Mood::Happy, 3)]));
        assert_eq!(
            views[0].insights.summary,
            "During this period, your dominant mood was happy. Your mood remained relatively stable."
        );
        assert_eq!(views[0].insights.patterns, vec!["Very stable mood pattern"]);
        assert!(views[0].insights.recommendations.is_empty());
    }

    #[test]
    fn averages_are_dated_by_period_start() {
        let entries = vec![
            entry(4, 9, Mood::Happy, 4),
            entry(5, 9, Mood::Sad, 2),
            entry(12, 9, Mood::Calm, 5),
        ];
        let series = period_average_series(&analyze(&entries));
        assert_eq!(
            series,
            vec![
                TrendPoint { date: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(), value: 3.0 },
                TrendPoint { date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(), value: 5.0 },
            ]
        );
    }
}
