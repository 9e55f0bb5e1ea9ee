//! Token estimation shared by every budget check.
//!
//! Heuristic: 1 token ≈ 4 characters, rounded up.

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
