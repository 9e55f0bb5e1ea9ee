//! `solace context`: Assemble a context from a JSON fixture.

use chrono::{Duration, Utc};
use serde::Deserialize;
use solace_config::AppConfig;
use solace_context::{AssembledContext, ContextBuilder, ContextDefaults, ContextOptions, ContextScope, ContextSources};
use solace_core::consent::ConsentCategory;
use solace_core::memory::{MemoryType, NewMemory};
use solace_core::profile::{RecentMessage, UserProfile};
use solace_memory::{
    DecayPolicy, InMemoryConsentStore, InMemoryMessages, InMemoryProfiles, InMemoryStore,
};
use solace_privacy::ConsentPolicyEngine;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct FixtureMemory {
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: f64,
    #[serde(default)]
    pub weight: Option<f64>,
    /// Days since the memory was last written.
    #[serde(default)]
    pub age_days: i64,
}

fn default_priority() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub(crate) struct FixtureProfile {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub preferences: serde_json::Value,
    #[serde(default)]
    pub latest_mood: Option<String>,
}

fn default_language() -> String {
    "en".into()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContextFixture {
    pub user_id: String,
    #[serde(default)]
    pub scope: ContextScope,
    #[serde(default)]
    pub profile: Option<FixtureProfile>,
    #[serde(default)]
    pub memories: Vec<FixtureMemory>,
    /// Oldest first.
    #[serde(default)]
    pub messages: Vec<RecentMessage>,
    /// Consent categories the user has turned off.
    #[serde(default)]
    pub revoked: Vec<ConsentCategory>,
    #[serde(default)]
    pub options: ContextOptions,
}

pub async fn run(config: &AppConfig, file: &Path) -> anyhow::Result<()> {
    let fixture: ContextFixture = super::read_json(file)?;
    let assembled = assemble(config, fixture).await?;

    println!("{}", assembled.text);
    println!();
    let sections: Vec<&str> = assembled.sections.iter().map(|s| s.as_str()).collect();
    println!("🧩 Sections: {}", sections.join(", "));
    if !assembled.dropped.is_empty() {
        let dropped: Vec<&str> = assembled.dropped.iter().map(|s| s.as_str()).collect();
        println!("✂️  Dropped:  {}", dropped.join(", "));
    }
    println!("🔢 Tokens:   ~{}", assembled.estimated_tokens);
    Ok(())
}

pub(crate) async fn assemble(
    config: &AppConfig,
    fixture: ContextFixture,
) -> anyhow::Result<AssembledContext> {
    let now = Utc::now();
    let user_id = fixture.user_id;

    let store = Arc::new(InMemoryStore::with_policy(DecayPolicy::from_config(&config.memory)));
    for memory in fixture.memories {
        let mut new = NewMemory::new(&user_id, memory.memory_type, memory.content)
            .with_tags(memory.tags)
            .with_priority(memory.priority);
        if let Some(weight) = memory.weight {
            new = new.with_weight(weight);
        }
        let written = now - Duration::days(memory.age_days.max(0));
        store
            .insert_item(new.into_item(Uuid::new_v4().to_string(), written))
            .await;
    }

    let profiles = Arc::new(InMemoryProfiles::new());
    if let Some(p) = fixture.profile {
        profiles
            .insert(UserProfile {
                user_id: user_id.clone(),
                language: p.language,
                preferences: p.preferences,
                latest_mood: p.latest_mood,
            })
            .await;
    }

    let messages = Arc::new(InMemoryMessages::new());
    for message in fixture.messages {
        messages.push(&user_id, message).await;
    }

    let consent = Arc::new(ConsentPolicyEngine::new(Arc::new(InMemoryConsentStore::new())));
    consent.initialize_user(&user_id).await?;
    for category in fixture.revoked {
        consent.revoke(&user_id, category).await?;
    }

    let builder = ContextBuilder::new(
        ContextSources {
            memory: store,
            profiles,
            messages,
            consent,
        },
        ContextDefaults::from_config(&config.context),
    );
    Ok(builder
        .build_with_report(&user_id, fixture.scope, fixture.options)
        .await)
}
