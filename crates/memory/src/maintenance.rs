//! Periodic background cleanup.

use solace_core::memory::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Runs [`MemoryStore::cleanup`] on a fixed period until the handle is aborted.
pub struct MemoryMaintenance {
    store: Arc<dyn MemoryStore>,
    period: Duration,
}

impl MemoryMaintenance {
    pub fn new(store: Arc<dyn MemoryStore>, period: Duration) -> Self {
        Self { store, period }
    }

    pub fn from_minutes(store: Arc<dyn MemoryStore>, minutes: u64) -> Self {
        Self::new(store, Duration::from_secs(minutes * 60))
    }

    /// Start the background loop. The first cycle runs immediately.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                match self.store.cleanup().await {
                    Ok(report) => debug!(
                        backend = self.store.name(),
                        decayed = report.decayed,
                        pruned = report.pruned,
                        "Maintenance cycle finished"
                    ),
                    Err(e) => warn!(backend = self.store.name(), error = %e, "Maintenance cycle failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use chrono::{Duration as ChronoDuration, Utc};
    use solace_core::memory::{MemoryType, NewMemory};

    #[tokio::test(start_paused = true)]
    async fn runs_cleanup_each_period() {
        let store = Arc::new(InMemoryStore::new());
        let mut expired = NewMemory::new("u1", MemoryType::ShortTerm, "temp")
            .into_item("tmp".into(), Utc::now() - ChronoDuration::days(1));
        expired.expires_at = Some(Utc::now() - ChronoDuration::hours(1));
        store.insert_item(expired).await;

        let handle = MemoryMaintenance::new(store.clone(), Duration::from_secs(60)).start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.is_empty().await);

        let mut later = NewMemory::new("u1", MemoryType::ShortTerm, "temp2")
            .into_item("tmp2".into(), Utc::now());
        later.expires_at = Some(Utc::now() - ChronoDuration::seconds(1));
        store.insert_item(later).await;

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(store.is_empty().await);
        handle.abort();
    }
}
