//! End-to-end integration tests for the Solace pipeline.
//!
//! These tests drive the crates together the way a host application would:
//! memories go into a store, consent decides which personal context may be
//! used, user text is redacted before it is logged as a message, and the
//! context builder assembles the final prompt context under a token budget.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use solace_context::{
    ContextBuilder, ContextDefaults, ContextOptions, ContextScope, ContextSources, SectionKind,
    SessionType, estimate_tokens,
};
use solace_core::consent::ConsentCategory;
use solace_core::error::{Result, StoreError};
use solace_core::feedback::{FeedbackContext, FeedbackInput, FeedbackTag, FeedbackWriter};
use solace_core::memory::{MemoryQuery, MemoryStore, MemoryType, NewMemory};
use solace_core::profile::{RecentMessage, TonePreference, UserProfile};
use solace_memory::{
    DecayPolicy, InMemoryConsentStore, InMemoryMessages, InMemoryProfiles, InMemoryStore,
    SqliteStore,
};
use solace_privacy::{
    ConsentPolicyEngine, ContentCategory, PrivacyFlags, RawContext, RedactionEngine,
    build_prompt_preamble, memory_limits_notice, prepare_downstream_prompt,
};
use solace_workflow::{FeedbackOutcome, FeedbackRetryQueue, RetryPolicy};

// ── Fixture ──────────────────────────────────────────────────────────────

struct Pipeline {
    store: Arc<InMemoryStore>,
    profiles: Arc<InMemoryProfiles>,
    messages: Arc<InMemoryMessages>,
    consent: Arc<ConsentPolicyEngine>,
    builder: ContextBuilder,
}

fn pipeline() -> Pipeline {
    let store = Arc::new(InMemoryStore::new());
    let profiles = Arc::new(InMemoryProfiles::new());
    let messages = Arc::new(InMemoryMessages::new());
    let consent = Arc::new(ConsentPolicyEngine::new(Arc::new(InMemoryConsentStore::new())));
    let builder = ContextBuilder::new(
        ContextSources {
            memory: store.clone(),
            profiles: profiles.clone(),
            messages: messages.clone(),
            consent: consent.clone(),
        },
        ContextDefaults::default(),
    );
    Pipeline {
        store,
        profiles,
        messages,
        consent,
        builder,
    }
}

async fn seed_user(p: &Pipeline) {
    p.consent.initialize_user("u1").await.unwrap();
    p.profiles
        .insert(UserProfile {
            user_id: "u1".into(),
            language: "en".into(),
            preferences: json!({"reminders": false}),
            latest_mood: Some("Anxious".into()),
        })
        .await;

    p.store
        .add(
            NewMemory::new("u1", MemoryType::ShortTerm, "Finds short breathing breaks helpful")
                .with_tags(["support", "breathing"])
                .with_priority(0.8),
        )
        .await
        .unwrap();
    p.store
        .add(
            NewMemory::new("u1", MemoryType::ShortTerm, "Mentioned a half-forgotten podcast")
                .with_tags(["support"])
                .with_priority(0.2),
        )
        .await
        .unwrap();
    p.store
        .add(
            NewMemory::new("u1", MemoryType::LongTerm, "Has been journaling for a year")
                .with_tags(["encouragement"])
                .with_priority(0.9),
        )
        .await
        .unwrap();
}

// ── Store → consent → redaction → context ────────────────────────────────

#[tokio::test]
async fn redacted_messages_reach_the_context() {
    let p = pipeline();
    seed_user(&p).await;

    let engine = RedactionEngine::new();
    let raw = "Email me at sam.lee@example.com after the argument with my landlord";
    let redacted = engine.classify_and_redact(Some(raw), &PrivacyFlags::default());
    assert!(redacted.clean_content.contains("[EMAIL]"));
    assert!(redacted.classification.categories.contains(&ContentCategory::Conflict));
    assert!(prepare_downstream_prompt(&redacted).starts_with("[SENSITIVITY: #personal, #conflict]"));

    p.messages
        .push(
            "u1",
            RecentMessage {
                content: redacted.clean_content.clone(),
                conversation_title: Some("Evening check-in".into()),
                created_at: Utc::now(),
            },
        )
        .await;

    let assembled = p
        .builder
        .build_with_report("u1", ContextScope::ShortTerm, ContextOptions::default())
        .await;

    assert_eq!(
        assembled.sections,
        vec![
            SectionKind::Tone,
            SectionKind::Memories,
            SectionKind::Messages,
            SectionKind::Profile
        ]
    );
    assert!(assembled.text.starts_with("AI Tone Preference: Supportive (70% weight)"));
    assert!(assembled.text.contains("Provide clear structure and reassurance."));
    assert!(assembled.text.contains("Finds short breathing breaks helpful"));
    // Below the weight floor and outside the scope respectively.
    assert!(!assembled.text.contains("podcast"));
    assert!(!assembled.text.contains("journaling for a year"));
    assert!(assembled.text.contains("[Evening check-in] Email me at [EMAIL]"));
    assert!(!assembled.text.contains("sam.lee@example.com"));
    assert!(assembled.text.contains("- Current Mood: Anxious"));
    assert!(estimate_tokens(&assembled.text) <= 4000);
}

#[tokio::test]
async fn context_respects_a_tight_budget() {
    let p = pipeline();
    seed_user(&p).await;

    let full = p
        .builder
        .build_with_report("u1", ContextScope::ShortTerm, ContextOptions::default())
        .await;
    let budget = full.estimated_tokens - 1;

    let trimmed = p
        .builder
        .build_with_report(
            "u1",
            ContextScope::ShortTerm,
            ContextOptions {
                max_tokens: Some(budget),
                ..Default::default()
            },
        )
        .await;

    assert!(estimate_tokens(&trimmed.text) <= budget);
    assert_eq!(trimmed.dropped, vec![SectionKind::Profile]);
    assert!(full.text.starts_with(&trimmed.text));
}

#[tokio::test]
async fn long_term_scope_reads_long_term_memories() {
    let p = pipeline();
    seed_user(&p).await;
    let text = p
        .builder
        .build("u1", ContextScope::LongTerm, ContextOptions::default())
        .await;
    assert!(text.contains("- [long_term] Has been journaling for a year"));
    assert!(!text.contains("breathing"));
}

#[tokio::test]
async fn consent_gates_personal_context() {
    let consent = ConsentPolicyEngine::new(Arc::new(InMemoryConsentStore::new()));
    consent.initialize_user("u1").await.unwrap();
    consent.revoke("u1", ConsentCategory::GoalLinking).await.unwrap();
    consent
        .set_temporary_opt_out("u1", "sess-1", ConsentCategory::MoodTracking)
        .await
        .unwrap();

    let raw = RawContext {
        mood: Some(json!({"latest": "anxious"})),
        tone: Some(json!("supportive")),
        goals: Some(json!(["sleep earlier"])),
        reflections: Some(json!(["felt calmer after a walk"])),
    };

    let filtered = consent.filter("u1", Some("sess-1"), raw.clone()).await.unwrap();
    assert!(filtered.mood.is_none());
    assert!(filtered.goals.is_none());
    assert_eq!(filtered.tone, Some(json!("supportive")));
    assert_eq!(
        build_prompt_preamble(&filtered),
        "With limited context available (toneContinuity, reflectionHistory)..."
    );
    assert_eq!(
        memory_limits_notice(&filtered).as_deref(),
        Some("Note: Some context is unavailable due to privacy settings (moodTracking, goalLinking).")
    );

    // The opt-out ends with the session; the revoke does not.
    assert!(consent.end_session("sess-1").await.unwrap());
    let after = consent.filter("u1", Some("sess-1"), raw).await.unwrap();
    assert!(after.mood.is_some());
    assert!(after.goals.is_none());

    let unknown = consent.filter("nobody", None, RawContext::default()).await;
    assert!(unknown.is_err());
}

#[tokio::test]
async fn journal_session_adds_reflection() {
    let p = pipeline();
    seed_user(&p).await;
    p.messages
        .push(
            "u1",
            RecentMessage {
                content: "Work has been overwhelming and I keep thinking about my career goals."
                    .into(),
                conversation_title: None,
                created_at: Utc::now(),
            },
        )
        .await;

    let assembled = p
        .builder
        .build_with_report(
            "u1",
            ContextScope::ShortTerm,
            ContextOptions {
                session_type: SessionType::Journal,
                tone_preference: TonePreference::Direct,
                ..Default::default()
            },
        )
        .await;
    assert!(assembled.sections.contains(&SectionKind::Reflection));
    assert!(!assembled.sections.contains(&SectionKind::Coaching));
}

#[tokio::test]
async fn builder_masks_raw_messages_and_follows_consent() {
    let p = pipeline();
    seed_user(&p).await;
    p.messages
        .push(
            "u1",
            RecentMessage {
                content: "Text me at 555-123-4567 or sam.lee@example.com".into(),
                conversation_title: None,
                created_at: Utc::now(),
            },
        )
        .await;
    p.consent
        .set_temporary_opt_out("u1", "sess-2", ConsentCategory::MoodTracking)
        .await
        .unwrap();

    let text = p
        .builder
        .build(
            "u1",
            ContextScope::ShortTerm,
            ContextOptions {
                session_id: Some("sess-2".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(text.contains("[General] Text me at [PHONE] or [EMAIL]"));
    assert!(!text.contains("555-123-4567"));
    assert!(text.starts_with("AI Tone Preference: Supportive (60% weight)"));
    assert!(text.contains("- Current Mood: unknown"));

    // Another user's session id is not honoured for u1.
    p.consent.initialize_user("u2").await.unwrap();
    p.consent
        .set_temporary_opt_out("u2", "sess-3", ConsentCategory::GoalLinking)
        .await
        .unwrap();
    let foreign = p
        .builder
        .build(
            "u1",
            ContextScope::ShortTerm,
            ContextOptions {
                session_id: Some("sess-3".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(foreign.contains("- Current Mood: unknown"));
}

// ── Persistent store ─────────────────────────────────────────────────────

#[tokio::test]
async fn sqlite_store_round_trip_and_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.sqlite");
    let store = SqliteStore::new(&path.to_string_lossy(), DecayPolicy::default())
        .await
        .unwrap();

    let item = store
        .add(
            NewMemory::new("u1", MemoryType::LongTerm, "Prefers morning check-ins")
                .with_tags(["routine"])
                .with_priority(0.7),
        )
        .await
        .unwrap();

    let found = store
        .query(
            "u1",
            MemoryQuery {
                tags: vec!["routine".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, item.id);

    let report = store.cleanup().await.unwrap();
    assert_eq!(report.decayed, 0);
    assert!(store.get(&item.id).await.unwrap().is_some());
}

// ── Feedback ─────────────────────────────────────────────────────────────

/// A writer whose store is down for the first `outage` calls.
struct RecoveringWriter {
    outage: AtomicU32,
}

#[async_trait::async_trait]
impl FeedbackWriter for RecoveringWriter {
    async fn write(&self, feedback: &FeedbackInput) -> Result<String> {
        if self.outage.load(Ordering::SeqCst) > 0 {
            self.outage.fetch_sub(1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("connection refused".into()).into());
        }
        Ok(format!("fb-{}", feedback.session_id))
    }
}

#[tokio::test(start_paused = true)]
async fn feedback_survives_a_store_outage() {
    let writer = Arc::new(RecoveringWriter {
        outage: AtomicU32::new(4),
    });
    let queue = FeedbackRetryQueue::new(
        writer,
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(100),
            retry_interval: Duration::from_secs(60),
            max_pending: 10,
        },
    );
    let feedback = FeedbackInput {
        session_id: "sess-9".into(),
        user_id: Some("u1".into()),
        rating: 5,
        tags: vec![FeedbackTag::Empathetic, FeedbackTag::Helpful],
        comment: Some("Felt heard".into()),
        context: FeedbackContext::default(),
    };

    assert_eq!(queue.submit(feedback).await.unwrap(), FeedbackOutcome::Pending);
    let handle = queue.start();
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(queue.pending_len().await, 0);
    handle.abort();
}
