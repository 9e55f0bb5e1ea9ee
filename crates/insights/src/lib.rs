//! Read-only analytics over a user's wellness history.
//!
//! - [`mood::analyze`] groups mood samples into weekly patterns
//! - [`timeline::build_timeline`] merges journal, mood and goal events
//! - [`insight::build_insight_summary`] aggregates everything into one report
//! - [`visualization::visualize`] turns weekly patterns into chart data
//!
//! None of these return errors; degenerate input yields empty or zeroed output.

pub mod insight;
pub mod mood;
mod stats;
pub mod timeline;
pub mod visualization;

pub use insight::{
    DepthByCategory, DepthScore, DepthTrend, GoalStats, InsightSummary, MoodStats, MoodTrend,
    TimelineHighlights, ToneUsage, TrendDirection, build_insight_summary,
};
pub use mood::{MoodPattern, MoodTrends, PatternDetails, PeriodRange, SignificantEvents, analyze};
pub use timeline::{TimelineItem, TimelineKind, TimelineTag, build_timeline};
pub use visualization::{
    DistributionSlice, HeatmapCell, MoodCharts, MoodVisualization, PatternInsights, TrendPoint,
    period_average_series, visualize,
};
