//! Error types for the Solace domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! The top-level [`Error`] follows the subsystem taxonomy (validation,
//! not-found, policy, transient store, redaction) so callers can tell
//! retryable failures from fatal ones and from degrade-and-continue cases.

use thiserror::Error;

/// The top-level error type for all Solace operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Caller errors ---
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // --- Consent policy ---
    #[error("Policy error: {0}")]
    Policy(#[from] ConsentError),

    // --- Store collaborator ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Redactor ---
    #[error("Redaction fault: {0}")]
    Redaction(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Store(e) if e.is_retryable())
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by a persistent store collaborator.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Concurrent modification of {id}")]
    Conflict { id: String },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl StoreError {
    /// Transient network/store failures and lost CAS races can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Conflict { .. })
    }
}

/// Consent policy failures. Policy is never assumed when records are missing.
#[derive(Debug, Clone, Error)]
pub enum ConsentError {
    #[error("Consent settings not found for user {0}")]
    NotFound(String),

    #[error("Unknown consent category: {0}")]
    InvalidCategory(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_displays_correctly() {
        let err = Error::Store(StoreError::Conflict { id: "mem_42".into() });
        assert!(err.to_string().contains("mem_42"));
        assert!(err.to_string().contains("Concurrent"));
    }

    #[test]
    fn consent_error_is_policy_error() {
        let err: Error = ConsentError::NotFound("user_1".into()).into();
        assert!(matches!(err, Error::Policy(_)));
        assert!(err.to_string().contains("user_1"));
    }

    #[test]
    fn only_transient_store_failures_are_retryable() {
        assert!(Error::Store(StoreError::Unavailable("timeout".into())).is_retryable());
        assert!(Error::Store(StoreError::Conflict { id: "a".into() }).is_retryable());
        assert!(!Error::Store(StoreError::NotFound("a".into())).is_retryable());
        assert!(!Error::Validation("bad".into()).is_retryable());
        assert!(!Error::Policy(ConsentError::NotFound("u".into())).is_retryable());
    }
}
