//! `solace cleanup`: Expiry/decay/prune cycles on the configured store.

use anyhow::Context;
use solace_config::AppConfig;
use solace_core::memory::{CleanupReport, MemoryStore};
use solace_memory::{DecayPolicy, MemoryMaintenance, SqliteStore};
use std::sync::Arc;

pub async fn run(config: &AppConfig, watch: bool) -> anyhow::Result<()> {
    if config.memory.backend != "sqlite" {
        println!("ℹ️  Backend is \"{}\"; nothing persisted to clean up.", config.memory.backend);
        return Ok(());
    }

    let db_path = config.memory.resolved_database_path();
    let store = open_store(config, &db_path.to_string_lossy()).await?;

    if watch {
        let minutes = config.memory.cleanup_interval_minutes;
        println!("🧹 Cleaning {} every {minutes} minute(s). Ctrl-C to stop.", db_path.display());
        let handle = MemoryMaintenance::from_minutes(Arc::new(store), minutes).start();
        tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
        handle.abort();
        println!("👋 Stopped.");
        return Ok(());
    }

    let report = store.cleanup().await.context("Cleanup failed")?;
    println!("🧹 Cleanup finished ({})", db_path.display());
    print_report(&report);
    Ok(())
}

fn print_report(report: &CleanupReport) {
    println!("   Expired removed:   {}", report.expired_removed);
    println!("   Decayed:           {}", report.decayed);
    println!("   Pruned:            {}", report.pruned);
    println!("   Skipped conflicts: {}", report.skipped_conflicts);
}

pub(crate) async fn open_store(config: &AppConfig, path: &str) -> anyhow::Result<SqliteStore> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    SqliteStore::new(path, DecayPolicy::from_config(&config.memory))
        .await
        .context("Failed to open memory store")
}
