//! Feedback writes with bounded retries and a background retry queue.

use solace_config::FeedbackConfig;
use solace_core::error::{Error, Result};
use solace_core::feedback::{FeedbackInput, FeedbackWriter};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub retry_interval: Duration,
    /// Queue capacity; the oldest item is dropped on overflow.
    pub max_pending: usize,
}

impl RetryPolicy {
    pub fn from_config(config: &FeedbackConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_backoff: Duration::from_millis(config.base_backoff_ms),
            retry_interval: Duration::from_secs(config.retry_interval_secs.max(1)),
            max_pending: config.max_pending.max(1),
        }
    }

    /// Delay after the zero-based `attempt` failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FeedbackConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Saved { feedback_id: String },
    /// Every attempt failed; the feedback waits in the retry queue.
    Pending,
}

/// Writes feedback through a [`FeedbackWriter`], parking it for later when
/// the store keeps failing.
#[derive(Clone)]
pub struct FeedbackRetryQueue {
    writer: Arc<dyn FeedbackWriter>,
    policy: RetryPolicy,
    pending: Arc<Mutex<VecDeque<FeedbackInput>>>,
}

impl FeedbackRetryQueue {
    pub fn new(writer: Arc<dyn FeedbackWriter>, policy: RetryPolicy) -> Self {
        Self {
            writer,
            policy,
            pending: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn from_config(writer: Arc<dyn FeedbackWriter>, config: &FeedbackConfig) -> Self {
        Self::new(writer, RetryPolicy::from_config(config))
    }

    /// Validate and write. Invalid input fails with [`Error::Validation`]
    /// and is never queued.
    pub async fn submit(&self, feedback: FeedbackInput) -> Result<FeedbackOutcome> {
        feedback.validate()?;
        match write_with_retry(self.writer.as_ref(), &self.policy, &feedback).await? {
            Some(feedback_id) => {
                info!(feedback_id = %feedback_id, session_id = %feedback.session_id, "Feedback saved");
                Ok(FeedbackOutcome::Saved { feedback_id })
            }
            None => {
                warn!(session_id = %feedback.session_id, "Feedback queued for background retry");
                self.enqueue(feedback).await;
                Ok(FeedbackOutcome::Pending)
            }
        }
    }

    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Retry queued feedback oldest first. Stops at the first item that
    /// still cannot be written so ordering is preserved. Returns how many
    /// were saved.
    ///
    /// The queue is drained into a local batch up front; the lock is not
    /// held while writing or backing off.
    pub async fn flush_pending(&self) -> usize {
        let mut batch = std::mem::take(&mut *self.pending.lock().await);
        if batch.is_empty() {
            return 0;
        }
        info!(queue_length = batch.len(), "Processing feedback queue");

        let mut saved = 0;
        while let Some(feedback) = batch.pop_front() {
            match write_with_retry(self.writer.as_ref(), &self.policy, &feedback).await {
                Ok(Some(feedback_id)) => {
                    info!(feedback_id = %feedback_id, session_id = %feedback.session_id, "Queued feedback saved");
                    saved += 1;
                }
                Ok(None) => {
                    warn!(session_id = %feedback.session_id, "Queued feedback still failing, will retry later");
                    batch.push_front(feedback);
                    break;
                }
                Err(e) => {
                    warn!(session_id = %feedback.session_id, error = %e, "Dropping queued feedback rejected by the store");
                }
            }
        }

        if !batch.is_empty() {
            self.requeue(batch).await;
        }
        saved
    }

    async fn enqueue(&self, feedback: FeedbackInput) {
        let mut pending = self.pending.lock().await;
        pending.push_back(feedback);
        self.enforce_capacity(&mut pending);
    }

    /// Put unsaved items back ahead of anything queued during the flush.
    async fn requeue(&self, mut batch: VecDeque<FeedbackInput>) {
        let mut pending = self.pending.lock().await;
        batch.append(&mut *pending);
        *pending = batch;
        self.enforce_capacity(&mut pending);
    }

    fn enforce_capacity(&self, pending: &mut VecDeque<FeedbackInput>) {
        while pending.len() > self.policy.max_pending {
            if let Some(dropped) = pending.pop_front() {
                warn!(
                    session_id = %dropped.session_id,
                    max_pending = self.policy.max_pending,
                    "Feedback queue full, dropping oldest item"
                );
            }
        }
    }

    /// Start the periodic retry loop. The first pass runs one
    /// `retry_interval` after start.
    pub fn start(&self) -> JoinHandle<()> {
        let queue = self.clone();
        let period = self.policy.retry_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let saved = queue.flush_pending().await;
                debug!(saved, "Feedback retry pass finished");
            }
        })
    }
}

/// `Ok(None)` when every attempt failed. Validation errors from the writer
/// are returned as-is since retrying cannot fix them.
async fn write_with_retry(
    writer: &dyn FeedbackWriter,
    policy: &RetryPolicy,
    feedback: &FeedbackInput,
) -> Result<Option<String>> {
    for attempt in 0..policy.max_attempts {
        match writer.write(feedback).await {
            Ok(id) => return Ok(Some(id)),
            Err(e @ Error::Validation(_)) => return Err(e),
            Err(e) => {
                warn!(
                    session_id = %feedback.session_id,
                    attempt = attempt + 1,
                    error = %e,
                    "Feedback save attempt failed"
                );
                if attempt + 1 < policy.max_attempts {
                    tokio::time::sleep(policy.backoff(attempt)).await;
                }
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use solace_core::StoreError;
    use solace_core::feedback::{FeedbackContext, FeedbackTag};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then succeeds.
    struct FlakyWriter {
        failures: AtomicU32,
        calls: AtomicU32,
        saved: Mutex<Vec<String>>,
    }

    impl FlakyWriter {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                saved: Mutex::new(Vec::new()),
            })
        }

        fn heal(&self) {
            self.failures.store(0, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl FeedbackWriter for FlakyWriter {
        async fn write(&self, feedback: &FeedbackInput) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(StoreError::Unavailable("db down".into()).into());
            }
            self.saved.lock().await.push(feedback.session_id.clone());
            Ok(format!("fb_{}", feedback.session_id))
        }
    }

    fn feedback(session: &str, rating: u8) -> FeedbackInput {
        FeedbackInput {
            session_id: session.into(),
            user_id: Some("u1".into()),
            rating,
            tags: vec![FeedbackTag::Helpful],
            comment: None,
            context: FeedbackContext::default(),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
            retry_interval: Duration::from_secs(300),
            max_pending: 100,
        }
    }

    async fn queued_sessions(queue: &FeedbackRetryQueue) -> Vec<String> {
        queue
            .pending
            .lock()
            .await
            .iter()
            .map(|f| f.session_id.clone())
            .collect()
    }

    #[test]
    fn backoff_doubles() {
        let p = policy();
        assert_eq!(p.backoff(0), Duration::from_secs(1));
        assert_eq!(p.backoff(1), Duration::from_secs(2));
        assert_eq!(p.backoff(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn saves_after_transient_failures() {
        let writer = FlakyWriter::new(2);
        let queue = FeedbackRetryQueue::new(writer.clone(), policy());
        let started = Instant::now();
        let outcome = queue.submit(feedback("s1", 5)).await.unwrap();
        assert_eq!(outcome, FeedbackOutcome::Saved { feedback_id: "fb_s1".into() });
        assert_eq!(writer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_queue_the_feedback() {
        let writer = FlakyWriter::new(10);
        let queue = FeedbackRetryQueue::new(writer.clone(), policy());
        let outcome = queue.submit(feedback("s1", 4)).await.unwrap();
        assert_eq!(outcome, FeedbackOutcome::Pending);
        assert_eq!(writer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(queue.pending_len().await, 1);
    }

    #[tokio::test]
    async fn invalid_feedback_is_rejected_up_front() {
        let writer = FlakyWriter::new(0);
        let queue = FeedbackRetryQueue::new(writer.clone(), policy());
        let err = queue.submit(feedback("", 0)).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(writer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(queue.pending_len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_keeps_order_and_stops_on_failure() {
        let writer = FlakyWriter::new(6);
        let queue = FeedbackRetryQueue::new(writer.clone(), policy());
        queue.submit(feedback("s1", 3)).await.unwrap();
        queue.submit(feedback("s2", 3)).await.unwrap();
        assert_eq!(queue.pending_len().await, 2);

        writer.failures.store(3, Ordering::SeqCst);
        assert_eq!(queue.flush_pending().await, 0);
        assert_eq!(queue.pending_len().await, 2);

        writer.heal();
        assert_eq!(queue.flush_pending().await, 2);
        assert_eq!(*writer.saved.lock().await, vec!["s1", "s2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn background_loop_drains_queue() {
        let writer = FlakyWriter::new(3);
        let queue = FeedbackRetryQueue::new(writer.clone(), policy());
        assert_eq!(queue.submit(feedback("s1", 2)).await.unwrap(), FeedbackOutcome::Pending);
        writer.heal();

        let handle = queue.start();
        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(queue.pending_len().await, 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(queue.pending_len().await, 0);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn queue_stays_available_during_a_flush() {
        let writer = FlakyWriter::new(3);
        let queue = FeedbackRetryQueue::new(writer.clone(), policy());
        queue.submit(feedback("s1", 3)).await.unwrap();

        // The first retry fails, leaving the flush in its backoff sleep.
        writer.failures.store(1, Ordering::SeqCst);
        let flusher = tokio::spawn({
            let queue = queue.clone();
            async move { queue.flush_pending().await }
        });
        tokio::time::sleep(Duration::from_millis(1)).await;

        let len = tokio::time::timeout(Duration::from_millis(10), queue.pending_len())
            .await
            .expect("queue lock is free while flushing");
        assert_eq!(len, 0);
        let outcome = tokio::time::timeout(Duration::from_millis(10), queue.submit(feedback("s2", 4)))
            .await
            .expect("submit does not wait for the flush")
            .unwrap();
        assert_eq!(outcome, FeedbackOutcome::Saved { feedback_id: "fb_s2".into() });

        assert_eq!(flusher.await.unwrap(), 1);
        assert_eq!(*writer.saved.lock().await, vec!["s2", "s1"]);
        assert_eq!(queue.pending_len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unsaved_items_return_ahead_of_new_ones() {
        let writer = FlakyWriter::new(u32::MAX);
        let queue = FeedbackRetryQueue::new(writer.clone(), policy());
        queue.submit(feedback("s1", 3)).await.unwrap();

        let flusher = tokio::spawn({
            let queue = queue.clone();
            async move { queue.flush_pending().await }
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        queue.enqueue(feedback("s2", 3)).await;

        assert_eq!(flusher.await.unwrap(), 0);
        assert_eq!(queued_sessions(&queue).await, vec!["s1", "s2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_drops_the_oldest() {
        let writer = FlakyWriter::new(u32::MAX);
        let queue = FeedbackRetryQueue::new(
            writer.clone(),
            RetryPolicy {
                max_pending: 2,
                ..policy()
            },
        );
        for session in ["s1", "s2", "s3"] {
            assert_eq!(
                queue.submit(feedback(session, 2)).await.unwrap(),
                FeedbackOutcome::Pending
            );
        }
        assert_eq!(queued_sessions(&queue).await, vec!["s2", "s3"]);
    }

    #[test]
    fn capacity_comes_from_config() {
        let config = FeedbackConfig {
            max_pending: 0,
            ..FeedbackConfig::default()
        };
        assert_eq!(RetryPolicy::from_config(&config).max_pending, 1);
        assert_eq!(RetryPolicy::default().max_pending, 1000);
    }
}
