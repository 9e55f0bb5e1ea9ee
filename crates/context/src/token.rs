//! Token estimation for budget enforcement.
//!
//! Heuristic: 1 token ≈ 4 characters, rounded up. Shared with the tone
//! crate so reflection and coaching estimates agree with trimming.

pub use solace_core::token::estimate_tokens;

/// Tokens of `sections` joined the way the builder joins them.
pub fn joined_tokens<S: AsRef<str>>(sections: &[S]) -> usize {
    let chars: usize = sections.iter().map(|s| s.as_ref().chars().count()).sum();
    let separators = sections.len().saturating_sub(1) * 2;
    (chars + separators).div_ceil(4)
}
