//! Consent audit trail.
//!
//! Every consent change and every policy filter run is recorded, in
//! memory and to any attached sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solace_core::consent::ConsentCategory;
use std::sync::{Mutex, MutexGuard};

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentAuditEntry {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub event: ConsentEvent,
}

/// Auditable consent events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsentEvent {
    Initialized,
    Granted { category: ConsentCategory },
    Revoked { category: ConsentCategory },
    TemporaryOptOut { category: ConsentCategory },
    SessionEnded,
    FilterApplied { fallback: bool },
}

/// Where audit entries are written.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &ConsentAuditEntry);
}

/// In-memory audit log with pluggable sinks.
pub struct ConsentAuditLog {
    entries: Mutex<Vec<ConsentAuditEntry>>,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for ConsentAuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentAuditLog")
            .field("entry_count", &self.lock().len())
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for ConsentAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsentAuditLog {
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            sinks,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConsentAuditEntry>> {
        // A panicked writer leaves a complete Vec behind; keep using it.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn log(&self, event: ConsentEvent, user_id: &str, session_id: Option<&str>) {
        let entry = ConsentAuditEntry {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            session_id: session_id.map(str::to_string),
            event,
        };

        self.lock().push(entry.clone());

        for sink in &self.sinks {
            sink.record(&entry);
        }
    }

    pub fn entries(&self) -> Vec<ConsentAuditEntry> {
        self.lock().clone()
    }

    pub fn entries_for_user(&self, user_id: &str) -> Vec<ConsentAuditEntry> {
        self.lock()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

/// A tracing-based sink that logs entries via `tracing::info!`.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &ConsentAuditEntry) {
        tracing::info!(
            event = ?entry.event,
            user_id = %entry.user_id,
            session_id = ?entry.session_id,
            "CONSENT AUDIT"
        );
    }
}
