//! Sensitive-content classification and redaction.
//!
//! Every piece of user text passes through [`RedactionEngine::classify_and_redact`]
//! before it is placed into a downstream prompt. Personal information is
//! masked; trauma, health, identity and conflict topics are flagged. The
//! engine never returns an error: unusable input fails closed as
//! `critical` with review required.

pub mod rules;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use rules::{RedactionAction, RedactionRule, RedactionRules};

// ── Types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SensitivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitivityLevel::Low => "low",
            SensitivityLevel::Medium => "medium",
            SensitivityLevel::High => "high",
            SensitivityLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SensitivityLevel {
    type Err = solace_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(SensitivityLevel::Low),
            "medium" => Ok(SensitivityLevel::Medium),
            "high" => Ok(SensitivityLevel::High),
            "critical" => Ok(SensitivityLevel::Critical),
            other => Err(solace_core::Error::Validation(format!(
                "unknown sensitivity level: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Personal,
    Trauma,
    Health,
    Identity,
    Conflict,
}

impl ContentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Personal => "personal",
            ContentCategory::Trauma => "trauma",
            ContentCategory::Health => "health",
            ContentCategory::Identity => "identity",
            ContentCategory::Conflict => "conflict",
        }
    }

    pub fn flag(&self) -> String {
        format!("#{}", self.as_str())
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentCategory {
    type Err = solace_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "personal" => Ok(ContentCategory::Personal),
            "trauma" => Ok(ContentCategory::Trauma),
            "health" => Ok(ContentCategory::Health),
            "identity" => Ok(ContentCategory::Identity),
            "conflict" => Ok(ContentCategory::Conflict),
            other => Err(solace_core::Error::Validation(format!(
                "unknown content category: {other}"
            ))),
        }
    }
}

/// Per-user switches. A category that is allowed is neither masked nor flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyFlags {
    #[serde(default)]
    pub allow_personal_info: bool,
    #[serde(default)]
    pub allow_trauma_content: bool,
    #[serde(default)]
    pub allow_health_data: bool,
    #[serde(default)]
    pub allow_identity_info: bool,
    #[serde(default)]
    pub allow_conflict_content: bool,
    #[serde(default = "default_review_threshold")]
    pub review_threshold: SensitivityLevel,
}

fn default_review_threshold() -> SensitivityLevel {
    SensitivityLevel::Medium
}

impl Default for PrivacyFlags {
    fn default() -> Self {
        Self {
            allow_personal_info: false,
            allow_trauma_content: false,
            allow_health_data: false,
            allow_identity_info: false,
            allow_conflict_content: false,
            review_threshold: default_review_threshold(),
        }
    }
}

impl PrivacyFlags {
    pub fn allows(&self, category: ContentCategory) -> bool {
        match category {
            ContentCategory::Personal => self.allow_personal_info,
            ContentCategory::Trauma => self.allow_trauma_content,
            ContentCategory::Health => self.allow_health_data,
            ContentCategory::Identity => self.allow_identity_info,
            ContentCategory::Conflict => self.allow_conflict_content,
        }
    }

    pub fn allow(mut self, category: ContentCategory) -> Self {
        match category {
            ContentCategory::Personal => self.allow_personal_info = true,
            ContentCategory::Trauma => self.allow_trauma_content = true,
            ContentCategory::Health => self.allow_health_data = true,
            ContentCategory::Identity => self.allow_identity_info = true,
            ContentCategory::Conflict => self.allow_conflict_content = true,
        }
        self
    }

    pub fn with_threshold(mut self, threshold: SensitivityLevel) -> Self {
        self.review_threshold = threshold;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityClassification {
    pub level: SensitivityLevel,
    /// Matched categories, in order of first match.
    pub categories: Vec<ContentCategory>,
    pub requires_review: bool,
    /// `#category` strings, or `["error"]` when the engine failed closed.
    pub redaction_flags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedSpan {
    /// Byte offsets into the text as it was when the matching rule ran.
    pub start: usize,
    pub end: usize,
    pub category: ContentCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionResult {
    pub clean_content: String,
    pub classification: SensitivityClassification,
    pub redacted_spans: Vec<RedactedSpan>,
}

// ── Engine ────────────────────────────────────────────────────────────

const REVIEW_NOTICE: &str =
    "[REVIEW REQUIRED: This content contains sensitive information that requires user review]";

/// Level is a pure function of the matched categories.
pub fn sensitivity_level(categories: &[ContentCategory]) -> SensitivityLevel {
    let has = |c: ContentCategory| categories.contains(&c);
    let high_risk = has(ContentCategory::Trauma) || has(ContentCategory::Health);

    if high_risk && categories.len() >= 2 {
        SensitivityLevel::Critical
    } else if high_risk {
        SensitivityLevel::High
    } else if !categories.is_empty() {
        SensitivityLevel::Medium
    } else {
        SensitivityLevel::Low
    }
}

#[derive(Debug, Clone, Default)]
pub struct RedactionEngine {
    rules: RedactionRules,
}

impl RedactionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: RedactionRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RedactionRules {
        &self.rules
    }

    /// Classify and redact `content` under the user's flags.
    ///
    /// `None` (content that could not be read) fails closed.
    pub fn classify_and_redact(&self, content: Option<&str>, flags: &PrivacyFlags) -> RedactionResult {
        let Some(text) = content else {
            warn!("Redaction received no content; failing closed");
            return Self::fail_closed();
        };

        let mut clean = text.to_string();
        let mut spans = Vec::new();
        let mut categories: Vec<ContentCategory> = Vec::new();
        let mut rule_review = false;

        for rule in self.rules.iter() {
            if flags.allows(rule.category) {
                continue;
            }
            let (rewritten, matched) = rule.apply(&clean);
            if matched.is_empty() {
                continue;
            }
            spans.extend(matched.into_iter().map(|(start, end)| RedactedSpan {
                start,
                end,
                category: rule.category,
            }));
            if !categories.contains(&rule.category) {
                categories.push(rule.category);
            }
            rule_review |= rule.requires_review;
            clean = rewritten;
        }

        let level = sensitivity_level(&categories);
        // Nothing matched means nothing to review, whatever the threshold.
        let requires_review =
            rule_review || (!categories.is_empty() && level >= flags.review_threshold);

        debug!(
            level = %level,
            categories = categories.len(),
            spans = spans.len(),
            requires_review,
            "Content classified"
        );

        RedactionResult {
            clean_content: clean,
            classification: SensitivityClassification {
                level,
                redaction_flags: categories.iter().map(ContentCategory::flag).collect(),
                categories,
                requires_review,
            },
            redacted_spans: spans,
        }
    }

    fn fail_closed() -> RedactionResult {
        RedactionResult {
            clean_content: String::new(),
            classification: SensitivityClassification {
                level: SensitivityLevel::Critical,
                categories: Vec::new(),
                requires_review: true,
                redaction_flags: vec!["error".to_string()],
            },
            redacted_spans: Vec::new(),
        }
    }
}

/// Build the text that is safe to hand to a downstream model.
///
/// Notices come first, separated from the content by a blank line; content
/// with no notices is returned unchanged.
pub fn prepare_downstream_prompt(result: &RedactionResult) -> String {
    let mut notices = Vec::new();
    if !result.classification.redaction_flags.is_empty() {
        notices.push(format!(
            "[SENSITIVITY: {}]",
            result.classification.redaction_flags.join(", ")
        ));
    }
    if result.classification.requires_review {
        notices.push(REVIEW_NOTICE.to_string());
    }

    if notices.is_empty() {
        result.clean_content.clone()
    } else {
        format!("{}\n\n{}", notices.join("\n"), result.clean_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redact(text: &str) -> RedactionResult {
        RedactionEngine::new().classify_and_redact(Some(text), &PrivacyFlags::default())
    }

    #[test]
    fn masks_personal_information() {
        let r = redact("John Smith can be reached at john@example.com or 555-123-4567");
        assert_eq!(r.clean_content, "[NAME] can be reached at [EMAIL] or [PHONE]");
        assert_eq!(r.classification.categories, vec![ContentCategory::Personal]);
        assert_eq!(r.redacted_spans.len(), 3);
        assert_eq!(r.classification.level, SensitivityLevel::Medium);
    }

    #[test]
    fn flags_trauma_without_changing_text() {
        let text = "I experienced trauma after the assault";
        let r = redact(text);
        assert_eq!(r.clean_content, text);
        assert_eq!(r.classification.categories, vec![ContentCategory::Trauma]);
        assert_eq!(r.classification.level, SensitivityLevel::High);
        assert!(r.classification.requires_review);
    }

    #[test]
    fn health_is_high() {
        let r = redact("My diagnosis was confirmed at the hospital");
        assert_eq!(r.classification.level, SensitivityLevel::High);
        assert_eq!(r.classification.categories, vec![ContentCategory::Health]);
    }

    #[test]
    fn allowed_categories_pass_through() {
        let text = "John Smith experienced trauma";
        let flags = PrivacyFlags::default()
            .allow(ContentCategory::Personal)
            .allow(ContentCategory::Trauma);
        let r = RedactionEngine::new().classify_and_redact(Some(text), &flags);
        assert_eq!(r.clean_content, text);
        assert!(r.classification.categories.is_empty());
        assert_eq!(r.classification.level, SensitivityLevel::Low);
        assert!(!r.classification.requires_review);
    }

    #[test]
    fn multiple_categories_are_critical() {
        let r = redact("John Smith (race: Asian) experienced trauma at the hospital");
        assert_eq!(
            r.clean_content,
            "[NAME] (race: Asian) experienced trauma at the hospital"
        );
        assert_eq!(
            r.classification.categories,
            vec![
                ContentCategory::Personal,
                ContentCategory::Trauma,
                ContentCategory::Health,
                ContentCategory::Identity,
            ]
        );
        assert_eq!(r.classification.level, SensitivityLevel::Critical);
    }

    #[test]
    fn identity_alone_is_medium() {
        let r = redact("My religion matters to me");
        assert_eq!(r.classification.level, SensitivityLevel::Medium);
        assert_eq!(r.classification.categories, vec![ContentCategory::Identity]);
    }

    #[test]
    fn empty_content_is_low() {
        let r = redact("");
        assert_eq!(r.clean_content, "");
        assert!(r.classification.categories.is_empty());
        assert_eq!(r.classification.level, SensitivityLevel::Low);
        assert!(!r.classification.requires_review);
    }

    #[test]
    fn missing_content_fails_closed() {
        let r = RedactionEngine::new().classify_and_redact(None, &PrivacyFlags::default());
        assert_eq!(r.classification.level, SensitivityLevel::Critical);
        assert_eq!(r.classification.redaction_flags, vec!["error".to_string()]);
        assert!(r.classification.requires_review);
        assert!(r.classification.categories.is_empty());
    }

    #[test]
    fn redaction_is_idempotent() {
        let samples = [
            "John Smith can be reached at john@example.com or 555-123-4567",
            "John Smith (race: Asian) experienced trauma at the hospital",
            "Had an argument with Mary Jones about court dates",
            "Today was a good day",
        ];
        for s in samples {
            let once = redact(s);
            let twice = redact(&once.clean_content);
            assert_eq!(once.clean_content, twice.clean_content, "input: {s}");
        }
    }

    #[test]
    fn level_is_pure_function_of_categories() {
        use ContentCategory::*;
        assert_eq!(sensitivity_level(&[]), SensitivityLevel::Low);
        assert_eq!(sensitivity_level(&[Personal]), SensitivityLevel::Medium);
        assert_eq!(sensitivity_level(&[Conflict]), SensitivityLevel::Medium);
        assert_eq!(sensitivity_level(&[Trauma]), SensitivityLevel::High);
        assert_eq!(sensitivity_level(&[Identity, Health]), SensitivityLevel::Critical);
        assert_eq!(sensitivity_level(&[Identity, Conflict]), SensitivityLevel::Medium);
    }

    #[test]
    fn spans_use_offsets_of_text_at_rule_time() {
        let r = redact("call Anna Berg at 555-123-4567");
        // NAME ran on the original text, PHONE on the masked text.
        assert_eq!(r.redacted_spans[0].start, 5);
        assert_eq!(r.redacted_spans[0].end, 14);
        assert_eq!(r.redacted_spans[1].start, "call [NAME] at ".len());
    }

    #[test]
    fn custom_rule_runs_after_defaults() {
        let rules = RedactionRules::default().with(
            RedactionRule::new(
                "address",
                r"(?i)\b\d+ [a-z]+ (street|st|avenue|ave)\b",
                ContentCategory::Personal,
                RedactionAction::Mask,
                "[ADDRESS]",
            )
            .unwrap(),
        );
        let r = RedactionEngine::with_rules(rules)
            .classify_and_redact(Some("I live at 12 elm street"), &PrivacyFlags::default());
        assert_eq!(r.clean_content, "I live at [ADDRESS]");
    }

    #[test]
    fn prompt_includes_notices() {
        let r = redact("John Smith experienced trauma");
        let prompt = prepare_downstream_prompt(&r);
        assert!(prompt.starts_with("[SENSITIVITY: #personal, #trauma]\n[REVIEW REQUIRED:"));
        assert!(prompt.ends_with("\n\n[NAME] experienced trauma"));
    }

    #[test]
    fn prompt_without_notices_is_content() {
        let r = redact("Today was a good day");
        assert_eq!(prepare_downstream_prompt(&r), "Today was a good day");
    }

    #[test]
    fn low_threshold_does_not_flag_clean_text() {
        let flags = PrivacyFlags::default().with_threshold(SensitivityLevel::Low);
        let r = RedactionEngine::new().classify_and_redact(Some("A calm walk"), &flags);
        assert!(!r.classification.requires_review);
    }
}
