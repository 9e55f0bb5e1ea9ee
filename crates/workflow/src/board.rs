//! Shared coordination state written by the command worker.

use crate::command_queue::{Command, CommandHandler, CommandPayload};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use solace_core::error::Result;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

/// Entries without an explicit TTL live this long.
const DEFAULT_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardEntry {
    pub value: Value,
    pub source_agent: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl BoardEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Key/value board that agents read each other's context, help requests,
/// insights, tasks and prompts from.
#[derive(Debug, Default)]
pub struct CoordinationBoard {
    entries: RwLock<HashMap<String, BoardEntry>>,
}

impl CoordinationBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let now = Utc::now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    /// Live keys starting with `prefix`, sorted.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let now = Utc::now();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Every live entry, keyed and ordered by key.
    pub async fn snapshot(&self) -> BTreeMap<String, BoardEntry> {
        let now = Utc::now();
        self.entries
            .read()
            .await
            .iter()
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    async fn put(&self, key: String, value: Value, source: &str, ttl_secs: Option<u64>) {
        let ttl = ttl_secs.map_or(DEFAULT_TTL_SECS, |s| i64::try_from(s).unwrap_or(i64::MAX));
        // Out-of-range TTLs never expire.
        let expires_at = Duration::try_seconds(ttl).and_then(|d| Utc::now().checked_add_signed(d));
        debug!(key = %key, source, "Board entry written");
        self.entries.write().await.insert(
            key,
            BoardEntry {
                value,
                source_agent: source.to_string(),
                expires_at,
            },
        );
    }
}

#[async_trait]
impl CommandHandler for CoordinationBoard {
    async fn handle(&self, command: &Command) -> Result<()> {
        let source = command.source_agent.as_str();
        let stamp = command.timestamp.timestamp_millis();
        match &command.payload {
            CommandPayload::SwitchAgent { context, .. } => {
                if let Some(context) = context {
                    let key = format!("agent:{}:context", command.target_agent);
                    self.put(key, json!(context), source, None).await;
                }
            }
            CommandPayload::UpdateContext { key, value, ttl_secs } => {
                self.put(key.clone(), json!(value), source, *ttl_secs).await;
            }
            CommandPayload::RequestHelp {
                issue,
                priority,
                context,
            } => {
                let value = json!({
                    "issue": issue,
                    "priority": priority,
                    "context": context,
                    "status": "pending",
                });
                self.put(format!("help:{source}:{stamp}"), value, source, None).await;
            }
            CommandPayload::ShareInsights {
                topic,
                insights,
                relevance,
            } => {
                let value = json!({
                    "topic": topic,
                    "insights": insights,
                    "relevance": relevance,
                    "source_agent": source,
                });
                self.put(format!("insights:{topic}:{stamp}"), value, source, None).await;
            }
            CommandPayload::CoordinateTask {
                task,
                dependencies,
                deadline,
            } => {
                let value = json!({
                    "task": task,
                    "dependencies": dependencies,
                    "deadline": deadline,
                    "status": "pending",
                    "assigned_to": command.target_agent,
                });
                self.put(format!("task:{source}:{stamp}"), value, source, None).await;
            }
            CommandPayload::CoordinatePrompts {
                prompt,
                target_agents,
                priority,
                context,
                deadline,
            } => {
                for agent in target_agents {
                    let value = json!({
                        "prompt": prompt,
                        "priority": priority,
                        "context": context,
                        "deadline": deadline,
                        "source_agent": source,
                    });
                    self.put(format!("prompt:{agent}:{stamp}"), value, source, None).await;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_queue::{CommandQueue, Priority};
    use std::sync::Arc;

    #[tokio::test]
    async fn switch_agent_stores_context_for_target() {
        let board = CoordinationBoard::new();
        let cmd = Command::switch_agent("journal", "coach", "goal talk", Some("wants structure".into()));
        board.handle(&cmd).await.unwrap();
        assert_eq!(board.get("agent:coach:context").await, Some(json!("wants structure")));
    }

    #[tokio::test]
    async fn switch_without_context_writes_nothing() {
        let board = CoordinationBoard::new();
        board
            .handle(&Command::switch_agent("journal", "coach", "goal talk", None))
            .await
            .unwrap();
        assert!(board.keys_with_prefix("").await.is_empty());
    }

    #[tokio::test]
    async fn prompts_fan_out_per_target() {
        let board = Arc::new(CoordinationBoard::new());
        let queue = CommandQueue::start(board.clone());
        queue
            .enqueue(Command::coordinate_prompts(
                "coach",
                "Check in about sleep",
                vec!["journal".into(), "mood".into()],
                Priority::Medium,
            ))
            .await
            .unwrap();
        queue.drain().await.unwrap();

        assert_eq!(board.keys_with_prefix("prompt:journal:").await.len(), 1);
        let keys = board.keys_with_prefix("prompt:mood:").await;
        assert_eq!(keys.len(), 1);
        let value = board.get(&keys[0]).await.unwrap();
        assert_eq!(value["priority"], "medium");
        assert_eq!(value["source_agent"], "coach");
    }

    #[tokio::test]
    async fn expired_entries_are_hidden_and_purged() {
        let board = CoordinationBoard::new();
        board.entries.write().await.insert(
            "old".into(),
            BoardEntry {
                value: json!(1),
                source_agent: "a".into(),
                expires_at: Some(Utc::now() - Duration::seconds(1)),
            },
        );
        board
            .handle(&Command::update_context("a", "b", "fresh", "v", Some(60)))
            .await
            .unwrap();
        assert!(board.get("old").await.is_none());
        assert_eq!(board.purge_expired().await, 1);
        assert_eq!(board.get("fresh").await, Some(json!("v")));
    }
}
