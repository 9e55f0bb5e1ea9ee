//! Mood-adaptive tone for Solace.
//!
//! - [`microcopy`]: opening, continuation and fallback lines per tone and mood
//! - [`weights`]: tone weighting, tone memory tags and mood cautions
//! - [`reflection`], [`coaching`], [`goal`]: prompt builders for journal sessions

pub mod coaching;
pub mod goal;
pub mod microcopy;
pub mod reflection;
pub mod weights;

pub use coaching::{CoachingEngine, CoachingInput, CoachingPrompt};
pub use goal::{GoalDuration, GoalEngine, GoalInput, SuggestedGoal};
pub use microcopy::{Microcopy, continuation_cue, fallback_cue, select};
pub use reflection::{FocusArea, ReflectionEngine, ReflectionPrompt, Sentiment};
pub use weights::{ToneWeights, is_tone_tag, mood_caution, tone_memory_tags};
