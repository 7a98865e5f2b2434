//! SQLite-backed [`CacheStore`] implementation.
//!
//! Maps each [`CacheStore`] operation onto the `response_cache` table
//! created by [`migrate`](crate::migrate::migrate).

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use lexfuse_core::store::{CacheEntry, CacheStats, CacheStore};

use crate::{db, migrate};

/// SQLite implementation of the [`CacheStore`] trait.
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `path` and make sure the schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect_path(path).await?;
        migrate::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_entry(row: &SqliteRow) -> CacheEntry {
    CacheEntry {
        fingerprint: row.get("fingerprint"),
        payload: row.get("payload"),
        created_at: row.get("created_at"),
        last_accessed_at: row.get("last_accessed_at"),
        hit_count: row.get("hit_count"),
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        let row = sqlx::query(
            "SELECT fingerprint, payload, created_at, last_accessed_at, hit_count
             FROM response_cache WHERE fingerprint = ?",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_entry))
    }

    async fn record_hit(&self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        let now = chrono::Utc::now().timestamp();
        let row = sqlx::query(
            r#"
            UPDATE response_cache
            SET hit_count = hit_count + 1, last_accessed_at = ?
            WHERE fingerprint = ?
            RETURNING fingerprint, payload, created_at, last_accessed_at, hit_count
            "#,
        )
        .bind(now)
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_entry))
    }

    async fn put(&self, fingerprint: &str, payload: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO response_cache (fingerprint, payload, created_at, last_accessed_at, hit_count)
            VALUES (?, ?, ?, ?, 0)
            ON CONFLICT(fingerprint) DO UPDATE SET
                payload = excluded.payload
            "#,
        )
        .bind(fingerprint)
        .bind(payload)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let rows = sqlx::query("SELECT fingerprint, hit_count FROM response_cache")
            .fetch_all(&self.pool)
            .await?;

        let pairs: Vec<(String, i64)> = rows
            .iter()
            .map(|r| (r.get("fingerprint"), r.get("hit_count")))
            .collect();

        Ok(CacheStats::from_rows(
            pairs.iter().map(|(fp, hits)| (fp.as_str(), *hits)),
        ))
    }

    async fn invalidate(&self, prefix: Option<&str>) -> Result<u64> {
        let result = match prefix {
            // substr comparison avoids LIKE wildcard escaping
            Some(prefix) => {
                sqlx::query("DELETE FROM response_cache WHERE substr(fingerprint, 1, length(?1)) = ?1")
                    .bind(prefix)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM response_cache")
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }
}
