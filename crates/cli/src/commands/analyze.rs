//! `solace analyze`: Mood patterns, timeline and insight summary.

use serde::Deserialize;
use serde_json::{Value, json};
use solace_core::mood::{Goal, JournalEntry, MoodEntry};
use solace_insights::{analyze, build_insight_summary, build_timeline, visualize};
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AnalyzeInput {
    pub moods: Vec<MoodEntry>,
    pub journal: Vec<JournalEntry>,
    pub goals: Vec<Goal>,
}

pub fn run(file: &Path) -> anyhow::Result<()> {
    let input: AnalyzeInput = super::read_json(file)?;
    let report = report(&input);

    if let Some(patterns) = report["patterns"].as_array() {
        println!("📈 {} weekly pattern(s)", patterns.len());
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) fn report(input: &AnalyzeInput) -> Value {
    let patterns = analyze(&input.moods);
    let timeline = build_timeline(&input.journal, &input.moods, &input.goals);
    let summary = build_insight_summary(&timeline, &input.moods, &input.journal, &input.goals);

    let periods: Vec<String> = patterns.iter().map(|p| p.period.to_string()).collect();
    json!({
        "periods": periods,
        "patterns": patterns,
        "visualizations": visualize(&patterns),
        "timeline": timeline,
        "summary": summary,
    })
}
