//! Privacy layer for Solace: redaction, consent policy, and consent auditing.
//!
//! Provides:
//! - **Redaction**: Mask personal information and flag sensitive topics before text leaves the subsystem
//! - **Consent**: Per-user category settings with revoke-only session overrides
//! - **Audit logging**: Structured record of every consent change and filter run

pub mod audit;
pub mod consent;
pub mod redaction;

pub use audit::{AuditSink, ConsentAuditEntry, ConsentAuditLog, ConsentEvent, TracingSink};
pub use consent::{
    ConsentPolicyEngine, ConsentStatus, FilteredContext, RawContext, build_prompt_preamble,
    memory_limits_notice,
};
pub use redaction::{
    ContentCategory, PrivacyFlags, RedactedSpan, RedactionAction, RedactionEngine,
    RedactionResult, RedactionRule, RedactionRules, SensitivityClassification, SensitivityLevel,
    prepare_downstream_prompt, sensitivity_level,
};
