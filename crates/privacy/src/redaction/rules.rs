//! Ordered, pluggable redaction rules.

use super::ContentCategory;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// What a matching rule does to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactionAction {
    /// Replace the match with the rule's replacement token
    Mask,
    /// Drop the match entirely
    Remove,
    /// Leave the text alone, only record the category
    Flag,
}

#[derive(Debug, Clone)]
pub struct RedactionRule {
    pub name: String,
    pub pattern: Regex,
    pub category: ContentCategory,
    pub action: RedactionAction,
    pub replacement: String,
    pub requires_review: bool,
}

impl RedactionRule {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        category: ContentCategory,
        action: RedactionAction,
        replacement: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            category,
            action,
            replacement: replacement.into(),
            requires_review: true,
        })
    }

    pub fn without_review(mut self) -> Self {
        self.requires_review = false;
        self
    }

    /// Apply this rule to `text`, left to right. Returns the rewritten text
    /// and the byte spans matched in the input.
    pub(crate) fn apply(&self, text: &str) -> (String, Vec<(usize, usize)>) {
        let mut out = String::with_capacity(text.len());
        let mut spans = Vec::new();
        let mut last = 0;
        for m in self.pattern.find_iter(text) {
            spans.push((m.start(), m.end()));
            out.push_str(&text[last..m.start()]);
            match self.action {
                RedactionAction::Mask => out.push_str(&self.replacement),
                RedactionAction::Remove => {}
                RedactionAction::Flag => out.push_str(m.as_str()),
            }
            last = m.end();
        }
        out.push_str(&text[last..]);
        (out, spans)
    }
}

static DEFAULT_RULES: LazyLock<Vec<RedactionRule>> = LazyLock::new(|| {
    use ContentCategory::*;
    use RedactionAction::*;

    let table: [(&str, &str, ContentCategory, RedactionAction, &str); 7] = [
        ("name", r"\b[A-Z][a-z]+ [A-Z][a-z]+\b", Personal, Mask, "[NAME]"),
        ("phone", r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b", Personal, Mask, "[PHONE]"),
        (
            "email",
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            Personal,
            Mask,
            "[EMAIL]",
        ),
        ("trauma", r"(?i)\b(abuse|violence|assault|trauma|ptsd)\b", Trauma, Flag, ""),
        (
            "health",
            r"(?i)\b(diagnosis|treatment|medication|therapy|hospital)\b",
            Health,
            Flag,
            "",
        ),
        (
            "identity",
            r"(?i)\b(race|ethnicity|gender|orientation|religion)\b",
            Identity,
            Flag,
            "",
        ),
        (
            "conflict",
            r"(?i)\b(argument|dispute|conflict|legal|court)\b",
            Conflict,
            Flag,
            "",
        ),
    ];

    table
        .into_iter()
        .filter_map(|(name, pattern, category, action, replacement)| {
            match RedactionRule::new(name, pattern, category, action, replacement) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    warn!(rule = name, error = %e, "Failed to compile redaction rule");
                    None
                }
            }
        })
        .collect()
});

/// The rule list, applied in order.
#[derive(Debug, Clone)]
pub struct RedactionRules {
    rules: Vec<RedactionRule>,
}

impl Default for RedactionRules {
    /// Personal-information masks first, then the flag-only topic rules.
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }
}

impl RedactionRules {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule; it runs after every rule already present.
    pub fn push(&mut self, rule: RedactionRule) {
        self.rules.push(rule);
    }

    pub fn with(mut self, rule: RedactionRule) -> Self {
        self.push(rule);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &RedactionRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_all_compile() {
        let rules = RedactionRules::default();
        assert_eq!(rules.len(), 7);
        let names: Vec<_> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names[0], "name");
        assert_eq!(names[6], "conflict");
    }

    #[test]
    fn mask_replaces_every_match() {
        let rule = RedactionRule::new(
            "phone",
            r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b",
            ContentCategory::Personal,
            RedactionAction::Mask,
            "[PHONE]",
        )
        .unwrap();
        let (out, spans) = rule.apply("call 555-123-4567 or 555.987.6543");
        assert_eq!(out, "call [PHONE] or [PHONE]");
        assert_eq!(spans, vec![(5, 17), (21, 33)]);
    }

    #[test]
    fn remove_drops_match() {
        let rule = RedactionRule::new(
            "secret",
            r"\s*#secret",
            ContentCategory::Personal,
            RedactionAction::Remove,
            "",
        )
        .unwrap();
        let (out, _) = rule.apply("note #secret here");
        assert_eq!(out, "note here");
    }

    #[test]
    fn flag_keeps_text() {
        let rules = RedactionRules::default();
        let trauma = rules.iter().find(|r| r.name == "trauma").unwrap();
        let (out, spans) = trauma.apply("PTSD after the assault");
        assert_eq!(out, "PTSD after the assault");
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(
            RedactionRule::new("bad", "(", ContentCategory::Personal, RedactionAction::Flag, "")
                .is_err()
        );
    }
}
