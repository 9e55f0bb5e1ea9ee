//! SQLite memory store.
//!
//! A single `memories` table. Every write bumps the `version` column;
//! decay and explicit updates are conditional on the version they read,
//! so concurrent cleanups and consumer writes never overwrite each other.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds,
//! `Z` suffix) so they compare correctly as text.

use crate::decay::DecayPolicy;
use crate::in_memory::validate_new;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use solace_core::error::{Error, Result, StoreError};
use solace_core::memory::{
    CleanupReport, MemoryItem, MemoryPatch, MemoryQuery, MemoryStore, MemoryType, NewMemory,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// A persistent memory store on SQLite.
pub struct SqliteStore {
    pool: SqlitePool,
    policy: DecayPolicy,
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(path: &str, policy: DecayPolicy) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Unavailable(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool, policy };
        store.run_migrations().await?;
        info!("SQLite memory store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool, policy: DecayPolicy) -> Result<Self> {
        let store = Self { pool, policy };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                id              TEXT PRIMARY KEY NOT NULL,
                user_id         TEXT NOT NULL,
                memory_type     TEXT NOT NULL,
                content         TEXT NOT NULL,
                tags            TEXT NOT NULL DEFAULT '[]',
                priority        REAL NOT NULL,
                weight          REAL NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                expires_at      TEXT,
                conversation_id TEXT,
                message_id      TEXT,
                metadata        TEXT NOT NULL DEFAULT 'null',
                version         INTEGER NOT NULL DEFAULT 1,
                last_decayed_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("memories table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_memories_user_type ON memories(user_id, memory_type)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("user index: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_memories_expires_at ON memories(expires_at)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("expiry index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<MemoryItem> {
        let get_str = |col: &str| -> Result<String> {
            row.try_get::<String, _>(col)
                .map_err(|e| StoreError::QueryFailed(format!("{col} column: {e}")).into())
        };
        let get_opt = |col: &str| -> Result<Option<String>> {
            row.try_get::<Option<String>, _>(col)
                .map_err(|e| StoreError::QueryFailed(format!("{col} column: {e}")).into())
        };
        let get_f64 = |col: &str| -> Result<f64> {
            row.try_get::<f64, _>(col)
                .map_err(|e| StoreError::QueryFailed(format!("{col} column: {e}")).into())
        };

        let type_str = get_str("memory_type")?;
        let memory_type = MemoryType::parse(&type_str)
            .ok_or_else(|| StoreError::QueryFailed(format!("unknown memory type {type_str}")))?;
        let tags: Vec<String> = serde_json::from_str(&get_str("tags")?)?;
        let metadata: serde_json::Value = serde_json::from_str(&get_str("metadata")?)?;
        let version: i64 = row
            .try_get("version")
            .map_err(|e| StoreError::QueryFailed(format!("version column: {e}")))?;

        Ok(MemoryItem {
            id: get_str("id")?,
            user_id: get_str("user_id")?,
            memory_type,
            content: get_str("content")?,
            tags,
            priority: get_f64("priority")?,
            weight: get_f64("weight")?,
            created_at: parse_ts(&get_str("created_at")?)?,
            updated_at: parse_ts(&get_str("updated_at")?)?,
            expires_at: get_opt("expires_at")?.as_deref().map(parse_ts).transpose()?,
            conversation_id: get_opt("conversation_id")?,
            message_id: get_opt("message_id")?,
            metadata,
            version: u64::try_from(version).unwrap_or_default(),
            last_decayed_at: get_opt("last_decayed_at")?.as_deref().map(parse_ts).transpose()?,
        })
    }

    async fn insert(&self, item: &MemoryItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO memories (
                id, user_id, memory_type, content, tags, priority, weight,
                created_at, updated_at, expires_at, conversation_id, message_id,
                metadata, version, last_decayed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&item.id)
        .bind(&item.user_id)
        .bind(item.memory_type.as_str())
        .bind(&item.content)
        .bind(serde_json::to_string(&item.tags)?)
        .bind(item.priority)
        .bind(item.weight)
        .bind(ts(item.created_at))
        .bind(ts(item.updated_at))
        .bind(item.expires_at.map(ts))
        .bind(&item.conversation_id)
        .bind(&item.message_id)
        .bind(serde_json::to_string(&item.metadata)?)
        .bind(item.version as i64)
        .bind(item.last_decayed_at.map(ts))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("INSERT failed: {e}")))?;
        Ok(())
    }

    /// Insert a fully-formed item (fixtures and imports keep their timestamps).
    pub async fn insert_item(&self, item: MemoryItem) -> Result<()> {
        self.insert(&item).await
    }

    /// Conditional decay write. Returns false when the row moved on.
    async fn decay_if_unchanged(
        &self,
        id: &str,
        expected_version: u64,
        new_weight: f64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE memories
            SET weight = ?1, last_decayed_at = ?2, version = version + 1
            WHERE id = ?3 AND version = ?4
            "#,
        )
        .bind(new_weight)
        .bind(ts(now))
        .bind(id)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("decay UPDATE failed: {e}")))?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl MemoryStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn add(&self, memory: NewMemory) -> Result<MemoryItem> {
        validate_new(&memory)?;
        let item = memory.into_item(Uuid::new_v4().to_string(), Utc::now());
        self.insert(&item).await?;
        debug!(id = %item.id, user_id = %item.user_id, "Stored memory");
        Ok(item)
    }

    async fn get(&self, id: &str) -> Result<Option<MemoryItem>> {
        let row = sqlx::query("SELECT * FROM memories WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET by ID: {e}")))?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn query(&self, user_id: &str, query: MemoryQuery) -> Result<Vec<MemoryItem>> {
        let now = Utc::now();
        let mut sql = String::from("SELECT * FROM memories WHERE user_id = ?");
        if query.memory_type.is_some() {
            sql.push_str(" AND memory_type = ?");
        }
        if query.min_priority.is_some() {
            sql.push_str(" AND priority >= ?");
        }
        if query.min_weight.is_some() {
            sql.push_str(" AND weight >= ?");
        }
        if !query.include_expired {
            sql.push_str(" AND weight >= ? AND (expires_at IS NULL OR expires_at > ?)");
        }
        sql.push_str(" ORDER BY priority DESC, weight DESC, updated_at DESC");

        let mut db_query = sqlx::query(&sql).bind(user_id);
        if let Some(t) = query.memory_type {
            db_query = db_query.bind(t.as_str());
        }
        if let Some(p) = query.min_priority {
            db_query = db_query.bind(p);
        }
        if let Some(w) = query.min_weight {
            db_query = db_query.bind(w);
        }
        if !query.include_expired {
            db_query = db_query.bind(self.policy.prune_below).bind(ts(now));
        }

        let rows = db_query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("memory query: {e}")))?;

        // Tags live in a JSON column; filter them here after ordering.
        let limit = self.policy.limit_for(&query);
        let mut results = Vec::new();
        for row in &rows {
            let item = Self::row_to_item(row)?;
            if query.tags.is_empty() || item.has_any_tag(&query.tags) {
                results.push(item);
                if results.len() == limit {
                    break;
                }
            }
        }
        Ok(results)
    }

    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<MemoryItem> {
        let mut item = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("memory {id}")))?;
        let read_version = item.version;
        patch.apply(&mut item, Utc::now());

        let result = sqlx::query(
            r#"
            UPDATE memories
            SET memory_type = ?1, content = ?2, tags = ?3, priority = ?4, weight = ?5,
                updated_at = ?6, expires_at = ?7, metadata = ?8, version = ?9
            WHERE id = ?10 AND version = ?11
            "#,
        )
        .bind(item.memory_type.as_str())
        .bind(&item.content)
        .bind(serde_json::to_string(&item.tags)?)
        .bind(item.priority)
        .bind(item.weight)
        .bind(ts(item.updated_at))
        .bind(item.expires_at.map(ts))
        .bind(serde_json::to_string(&item.metadata)?)
        .bind(item.version as i64)
        .bind(id)
        .bind(read_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("UPDATE failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict { id: id.to_string() }.into());
        }
        Ok(item)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM memories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn cleanup(&self) -> Result<CleanupReport> {
        let now = Utc::now();
        let mut report = CleanupReport::default();

        let expired = sqlx::query("DELETE FROM memories WHERE expires_at IS NOT NULL AND expires_at <= ?1")
            .bind(ts(now))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("expiry DELETE failed: {e}")))?;
        report.expired_removed = expired.rows_affected() as usize;

        // updated_at <= cutoff is necessary for being due; is_due checks the decay clock too.
        let cutoff = now - self.policy.decay_after;
        let rows = sqlx::query("SELECT * FROM memories WHERE updated_at <= ?1")
            .bind(ts(cutoff))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("decay scan: {e}")))?;

        for row in &rows {
            let item = Self::row_to_item(row)?;
            if !self.policy.is_due(&item, now) {
                continue;
            }
            let new_weight = self.policy.decayed_weight(item.weight);
            if self
                .decay_if_unchanged(&item.id, item.version, new_weight, now)
                .await?
            {
                report.decayed += 1;
            } else {
                report.skipped_conflicts += 1;
            }
        }

        let pruned = sqlx::query("DELETE FROM memories WHERE weight < ?1")
            .bind(self.policy.prune_below)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("prune DELETE failed: {e}")))?;
        report.pruned = pruned.rows_affected() as usize;

        info!(
            removed = report.expired_removed,
            decayed = report.decayed,
            skipped = report.skipped_conflicts,
            pruned = report.pruned,
            "SQLite cleanup complete"
        );
        Ok(report)
    }
}

fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::QueryFailed(format!("bad timestamp {s}: {e}")).into())
}
