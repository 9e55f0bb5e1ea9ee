//! Consent policy: decides which personal context may be used.
//!
//! A category is usable for a turn only if the user's setting enables it
//! and the current session has not temporarily opted out. Missing user
//! settings are an error; policy is never assumed.

use crate::audit::{ConsentAuditLog, ConsentEvent};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use solace_core::consent::{
    ConsentCategory, ConsentOverride, ConsentSettings, ConsentStore, SessionConsent,
};
use solace_core::error::{ConsentError, Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

const FULL_CONTEXT: &str = "Using your full context and history...";
const NEUTRAL_CONTEXT: &str = "In a neutral context...";

/// Unfiltered personal context, one slot per consent category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawContext {
    #[serde(default)]
    pub mood: Option<serde_json::Value>,
    #[serde(default)]
    pub tone: Option<serde_json::Value>,
    #[serde(default)]
    pub goals: Option<serde_json::Value>,
    #[serde(default)]
    pub reflections: Option<serde_json::Value>,
}

/// Effective consent per category, in category order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentStatus(pub BTreeMap<ConsentCategory, bool>);

impl ConsentStatus {
    pub fn is_enabled(&self, category: ConsentCategory) -> bool {
        self.0.get(&category).copied().unwrap_or(false)
    }

    pub fn enabled(&self) -> Vec<ConsentCategory> {
        self.0.iter().filter(|(_, on)| **on).map(|(c, _)| *c).collect()
    }

    pub fn disabled(&self) -> Vec<ConsentCategory> {
        self.0.iter().filter(|(_, on)| !**on).map(|(c, _)| *c).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredContext {
    pub mood: Option<serde_json::Value>,
    pub tone: Option<serde_json::Value>,
    pub goals: Option<serde_json::Value>,
    pub reflections: Option<serde_json::Value>,
    pub consent_status: ConsentStatus,
    /// True when no category is enabled.
    pub fallback_used: bool,
}

pub struct ConsentPolicyEngine {
    store: Arc<dyn ConsentStore>,
    audit: Arc<ConsentAuditLog>,
}

impl ConsentPolicyEngine {
    pub fn new(store: Arc<dyn ConsentStore>) -> Self {
        Self::with_audit(store, Arc::new(ConsentAuditLog::new()))
    }

    pub fn with_audit(store: Arc<dyn ConsentStore>, audit: Arc<ConsentAuditLog>) -> Self {
        Self { store, audit }
    }

    pub fn audit_log(&self) -> &ConsentAuditLog {
        &self.audit
    }

    /// Create default settings (all enabled). Existing settings are kept.
    pub async fn initialize_user(&self, user_id: &str) -> Result<ConsentSettings> {
        if let Some(existing) = self.store.get_settings(user_id).await? {
            return Ok(existing);
        }
        let settings = ConsentSettings::all_enabled(user_id, Utc::now());
        self.store.put_settings(settings.clone()).await?;
        self.audit.log(ConsentEvent::Initialized, user_id, None);
        info!(user_id = %user_id, "Consent settings initialized");
        Ok(settings)
    }

    pub async fn grant(&self, user_id: &str, category: ConsentCategory) -> Result<()> {
        self.set_category(user_id, category, true).await
    }

    pub async fn revoke(&self, user_id: &str, category: ConsentCategory) -> Result<()> {
        self.set_category(user_id, category, false).await
    }

    async fn set_category(&self, user_id: &str, category: ConsentCategory, enabled: bool) -> Result<()> {
        let mut settings = self.settings_for(user_id).await?;
        settings.set(category, enabled, Utc::now());
        self.store.put_settings(settings).await?;

        let event = if enabled {
            ConsentEvent::Granted { category }
        } else {
            ConsentEvent::Revoked { category }
        };
        self.audit.log(event, user_id, None);
        info!(user_id = %user_id, category = %category, enabled, "Consent updated");
        Ok(())
    }

    /// Revoke `category` for the rest of the session. Overrides never grant.
    pub async fn set_temporary_opt_out(
        &self,
        user_id: &str,
        session_id: &str,
        category: ConsentCategory,
    ) -> Result<()> {
        let mut session = match self.store.get_session(session_id).await? {
            Some(existing) => {
                ensure_owner(&existing, user_id)?;
                existing
            }
            None => SessionConsent::new(session_id, user_id, Utc::now()),
        };
        session.overrides.insert(category, ConsentOverride::opt_out());
        self.store.put_session(session).await?;

        self.audit
            .log(ConsentEvent::TemporaryOptOut { category }, user_id, Some(session_id));
        debug!(user_id = %user_id, session_id = %session_id, category = %category, "Session opt-out");
        Ok(())
    }

    /// Drop every override of a session.
    pub async fn end_session(&self, session_id: &str) -> Result<bool> {
        let owner = self
            .store
            .get_session(session_id)
            .await?
            .map(|s| s.user_id)
            .unwrap_or_default();
        let existed = self.store.end_session(session_id).await?;
        if existed {
            self.audit
                .log(ConsentEvent::SessionEnded, &owner, Some(session_id));
        }
        Ok(existed)
    }

    pub async fn effective_consent(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        category: ConsentCategory,
    ) -> Result<bool> {
        let status = self.consent_status(user_id, session_id).await?;
        Ok(status.is_enabled(category))
    }

    /// Strip every slot of `raw` whose category is not effectively enabled.
    pub async fn filter(
        &self,
        user_id: &str,
        session_id: Option<&str>,
        raw: RawContext,
    ) -> Result<FilteredContext> {
        let status = self.consent_status(user_id, session_id).await?;
        let keep = |category: ConsentCategory, value: Option<serde_json::Value>| {
            if status.is_enabled(category) { value } else { None }
        };

        let filtered = FilteredContext {
            mood: keep(ConsentCategory::MoodTracking, raw.mood),
            tone: keep(ConsentCategory::ToneContinuity, raw.tone),
            goals: keep(ConsentCategory::GoalLinking, raw.goals),
            reflections: keep(ConsentCategory::ReflectionHistory, raw.reflections),
            fallback_used: status.enabled().is_empty(),
            consent_status: status,
        };

        self.audit.log(
            ConsentEvent::FilterApplied {
                fallback: filtered.fallback_used,
            },
            user_id,
            session_id,
        );
        Ok(filtered)
    }

    async fn settings_for(&self, user_id: &str) -> Result<ConsentSettings> {
        self.store
            .get_settings(user_id)
            .await?
            .ok_or_else(|| ConsentError::NotFound(user_id.to_string()).into())
    }

    /// Effective consent for every category. A session that belongs to
    /// another user is a [`Error::Validation`].
    pub async fn consent_status(
        &self,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<ConsentStatus> {
        let settings = self.settings_for(user_id).await?;
        let session = match session_id {
            Some(id) => self.store.get_session(id).await?,
            None => None,
        };
        if let Some(session) = &session {
            ensure_owner(session, user_id)?;
        }

        let status = ConsentCategory::ALL
            .into_iter()
            .map(|c| {
                let opted_out = session.as_ref().is_some_and(|s| s.is_opted_out(c));
                (c, settings.is_enabled(c) && !opted_out)
            })
            .collect();
        Ok(ConsentStatus(status))
    }
}

fn ensure_owner(session: &SessionConsent, user_id: &str) -> Result<()> {
    if session.user_id == user_id {
        return Ok(());
    }
    warn!(
        session_id = %session.session_id,
        owner = %session.user_id,
        user_id = %user_id,
        "Session used by a user that does not own it"
    );
    Err(Error::Validation(format!(
        "session {} does not belong to user {user_id}",
        session.session_id
    )))
}

/// One-line preamble describing how much personal context is in play.
pub fn build_prompt_preamble(filtered: &FilteredContext) -> String {
    if filtered.fallback_used {
        return NEUTRAL_CONTEXT.to_string();
    }
    let enabled = filtered.consent_status.enabled();
    if enabled.len() == ConsentCategory::ALL.len() {
        return FULL_CONTEXT.to_string();
    }
    let names: Vec<&str> = enabled.iter().map(ConsentCategory::as_str).collect();
    format!("With limited context available ({})...", names.join(", "))
}

/// Notice listing the categories withheld by privacy settings, if any.
pub fn memory_limits_notice(filtered: &FilteredContext) -> Option<String> {
    let disabled = filtered.consent_status.disabled();
    if disabled.is_empty() {
        return None;
    }
    let names: Vec<&str> = disabled.iter().map(ConsentCategory::as_str).collect();
    Some(format!(
        "Note: Some context is unavailable due to privacy settings ({}).",
        names.join(", ")
    ))
}
