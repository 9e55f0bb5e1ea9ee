//! Context assembly for Solace.
//!
//! The [`ContextBuilder`] decides, for each assistant turn, what the
//! assistant may see: tone guidance, tone-weighted memories, recent
//! messages, the user profile and, in journal sessions, reflection and
//! coaching prompts. Output always fits the token budget.

pub mod builder;
pub mod sections;
pub mod token;

pub use builder::{
    AssembledContext, ContextBuilder, ContextDefaults, ContextOptions, ContextScope,
    ContextSources, SessionType,
};
pub use sections::SectionKind;
pub use token::estimate_tokens;
