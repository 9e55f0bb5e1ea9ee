//! Serialized processing of inter-agent commands.
//!
//! A [`CommandQueue`] owns exactly one worker task. Commands are validated
//! when enqueued and handed to the [`CommandHandler`] strictly in order; a
//! failing handler is logged and counted but never stops the worker.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solace_core::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// What a command asks the receiving agent to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandPayload {
    SwitchAgent {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    UpdateContext {
        key: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ttl_secs: Option<u64>,
    },
    RequestHelp {
        issue: String,
        priority: Priority,
        context: String,
    },
    ShareInsights {
        topic: String,
        insights: String,
        relevance: Priority,
    },
    CoordinateTask {
        task: String,
        #[serde(default)]
        dependencies: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deadline: Option<String>,
    },
    CoordinatePrompts {
        prompt: String,
        target_agents: Vec<String>,
        priority: Priority,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deadline: Option<String>,
    },
}

impl CommandPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandPayload::SwitchAgent { .. } => "switch_agent",
            CommandPayload::UpdateContext { .. } => "update_context",
            CommandPayload::RequestHelp { .. } => "request_help",
            CommandPayload::ShareInsights { .. } => "share_insights",
            CommandPayload::CoordinateTask { .. } => "coordinate_task",
            CommandPayload::CoordinatePrompts { .. } => "coordinate_prompts",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(flatten)]
    pub payload: CommandPayload,
    pub source_agent: String,
    pub target_agent: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Command {
    pub fn new(
        source_agent: impl Into<String>,
        target_agent: impl Into<String>,
        payload: CommandPayload,
    ) -> Self {
        Self {
            payload,
            source_agent: source_agent.into(),
            target_agent: target_agent.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn switch_agent(
        source_agent: impl Into<String>,
        target_agent: impl Into<String>,
        reason: impl Into<String>,
        context: Option<String>,
    ) -> Self {
        Self::new(
            source_agent,
            target_agent,
            CommandPayload::SwitchAgent {
                reason: reason.into(),
                context,
            },
        )
    }

    pub fn update_context(
        source_agent: impl Into<String>,
        target_agent: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl_secs: Option<u64>,
    ) -> Self {
        Self::new(
            source_agent,
            target_agent,
            CommandPayload::UpdateContext {
                key: key.into(),
                value: value.into(),
                ttl_secs,
            },
        )
    }

    /// Prompts are broadcast, so the envelope target is `all`.
    pub fn coordinate_prompts(
        source_agent: impl Into<String>,
        prompt: impl Into<String>,
        target_agents: Vec<String>,
        priority: Priority,
    ) -> Self {
        Self::new(
            source_agent,
            "all",
            CommandPayload::CoordinatePrompts {
                prompt: prompt.into(),
                target_agents,
                priority,
                context: None,
                deadline: None,
            },
        )
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// Checks that every required field carries a value. All problems are
    /// reported together.
    pub fn validate(&self) -> Result<()> {
        let mut missing: Vec<&str> = Vec::new();
        if self.source_agent.trim().is_empty() {
            missing.push("source_agent");
        }
        if self.target_agent.trim().is_empty() {
            missing.push("target_agent");
        }

        let blank = |s: &String| s.trim().is_empty();
        match &self.payload {
            CommandPayload::SwitchAgent { reason, .. } => {
                if blank(reason) {
                    missing.push("reason");
                }
            }
            CommandPayload::UpdateContext { key, ttl_secs, .. } => {
                if blank(key) {
                    missing.push("key");
                }
                if *ttl_secs == Some(0) {
                    missing.push("ttl_secs");
                }
            }
            CommandPayload::RequestHelp { issue, .. } => {
                if blank(issue) {
                    missing.push("issue");
                }
            }
            CommandPayload::ShareInsights { topic, insights, .. } => {
                if blank(topic) {
                    missing.push("topic");
                }
                if blank(insights) {
                    missing.push("insights");
                }
            }
            CommandPayload::CoordinateTask { task, dependencies, .. } => {
                if blank(task) {
                    missing.push("task");
                }
                if dependencies.iter().any(blank) {
                    missing.push("dependencies");
                }
            }
            CommandPayload::CoordinatePrompts {
                prompt,
                target_agents,
                ..
            } => {
                if blank(prompt) {
                    missing.push("prompt");
                }
                if target_agents.is_empty() || target_agents.iter().any(blank) {
                    missing.push("target_agents");
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "Invalid {} command: {}",
                self.kind(),
                missing.join(", ")
            )))
        }
    }
}

/// Executes one command. Called from the queue's single worker.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, command: &Command) -> Result<()>;
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub processed: u64,
    pub failed: u64,
}

impl Counters {
    fn snapshot(&self) -> QueueStats {
        QueueStats {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

enum Message {
    Run(Command),
    Flush(oneshot::Sender<()>),
}

pub struct CommandQueue;

impl CommandQueue {
    /// Spawn the worker and return the handle that feeds it.
    pub fn start(handler: Arc<dyn CommandHandler>) -> CommandQueueHandle {
        Self::with_capacity(handler, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(handler: Arc<dyn CommandHandler>, capacity: usize) -> CommandQueueHandle {
        let (tx, rx) = mpsc::channel::<Message>(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker = tokio::spawn(run_worker(rx, handler, counters.clone()));
        info!(capacity, "Command queue started");
        CommandQueueHandle {
            tx,
            worker,
            counters,
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Message>,
    handler: Arc<dyn CommandHandler>,
    counters: Arc<Counters>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            Message::Run(command) => match handler.handle(&command).await {
                Ok(()) => {
                    counters.processed.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        kind = command.kind(),
                        source = %command.source_agent,
                        target = %command.target_agent,
                        "Command processed"
                    );
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(kind = command.kind(), source = %command.source_agent, error = %e, "Command failed");
                }
            },
            Message::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Command queue closed, worker exiting");
}

/// Owner side of a running [`CommandQueue`].
pub struct CommandQueueHandle {
    tx: mpsc::Sender<Message>,
    worker: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl CommandQueueHandle {
    /// Validate and enqueue. Invalid commands never reach the worker.
    pub async fn enqueue(&self, command: Command) -> Result<()> {
        command.validate()?;
        self.tx
            .send(Message::Run(command))
            .await
            .map_err(|_| Error::Internal("command queue is stopped".into()))
    }

    /// Resolves once every command enqueued before this call has been handled.
    pub async fn drain(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(Message::Flush(done_tx))
            .await
            .map_err(|_| Error::Internal("command queue is stopped".into()))?;
        done_rx
            .await
            .map_err(|_| Error::Internal("command queue worker exited before draining".into()))
    }

    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }

    /// Close the queue, let the worker finish what is already queued and
    /// wait for it to exit.
    pub async fn stop(self) -> Result<QueueStats> {
        let CommandQueueHandle {
            tx,
            worker,
            counters,
        } = self;
        drop(tx);
        worker
            .await
            .map_err(|e| Error::Internal(format!("command queue worker failed: {e}")))?;
        let stats = counters.snapshot();
        info!(processed = stats.processed, failed = stats.failed, "Command queue stopped");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandHandler for Recorder {
        async fn handle(&self, command: &Command) -> Result<()> {
            // Yield so a second consumer, if one existed, could interleave.
            tokio::time::sleep(Duration::from_millis(5)).await;
            let label = match &command.payload {
                CommandPayload::UpdateContext { key, .. } => key.clone(),
                other => other.kind().to_string(),
            };
            if label == "boom" {
                return Err(Error::Internal("handler failed".into()));
            }
            self.seen.lock().await.push(label);
            Ok(())
        }
    }

    fn update(key: &str) -> Command {
        Command::update_context("journal", "coach", key, "v", None)
    }

    #[tokio::test]
    async fn processes_in_enqueue_order() {
        let recorder = Arc::new(Recorder::default());
        let queue = CommandQueue::start(recorder.clone());
        for key in ["a", "b", "c", "d"] {
            queue.enqueue(update(key)).await.unwrap();
        }
        queue.drain().await.unwrap();
        assert_eq!(*recorder.seen.lock().await, vec!["a", "b", "c", "d"]);
        assert_eq!(queue.stats().processed, 4);
    }

    #[tokio::test]
    async fn invalid_commands_are_rejected() {
        let recorder = Arc::new(Recorder::default());
        let queue = CommandQueue::start(recorder.clone());
        let err = queue
            .enqueue(Command::switch_agent("journal", "", " ", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("target_agent, reason"));
        queue.drain().await.unwrap();
        assert!(recorder.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn handler_failure_does_not_stop_worker() {
        let recorder = Arc::new(Recorder::default());
        let queue = CommandQueue::start(recorder.clone());
        queue.enqueue(update("boom")).await.unwrap();
        queue.enqueue(update("after")).await.unwrap();
        let stats = queue.stop().await.unwrap();
        assert_eq!(stats, QueueStats { processed: 1, failed: 1 });
        assert_eq!(*recorder.seen.lock().await, vec!["after"]);
    }

    #[tokio::test]
    async fn stop_finishes_queued_work() {
        let recorder = Arc::new(Recorder::default());
        let queue = CommandQueue::with_capacity(recorder.clone(), 2);
        for key in ["x", "y", "z"] {
            queue.enqueue(update(key)).await.unwrap();
        }
        queue.stop().await.unwrap();
        assert_eq!(recorder.seen.lock().await.len(), 3);
    }

    #[test]
    fn broadcast_prompts_need_targets() {
        let cmd = Command::coordinate_prompts("coach", "How did today go?", vec![], Priority::High);
        assert_eq!(cmd.target_agent, "all");
        assert!(cmd.validate().is_err());

        let ok = Command::coordinate_prompts("coach", "How did today go?", vec!["journal".into()], Priority::Low);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn zero_ttl_is_invalid() {
        let cmd = Command::update_context("a", "b", "k", "v", Some(0));
        assert!(cmd.validate().unwrap_err().to_string().contains("ttl_secs"));
    }

    #[test]
    fn wire_format_is_tagged() {
        let cmd = Command::switch_agent("journal", "coach", "user asked for goals", None);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "switch_agent");
        assert_eq!(json["reason"], "user asked for goals");
        let back: Command = serde_json::from_value(json).unwrap();
        assert_eq!(back, cmd);
    }
}
