//! Response cache storage abstraction.
//!
//! The [`CacheStore`] trait is a fingerprint-keyed key-value store for
//! serialized response payloads, enabling pluggable backends (SQLite in the
//! app crate, in-memory here for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! # Entry lifecycle
//!
//! | Event | Effect |
//! |-------|--------|
//! | first compute | [`put`](CacheStore::put) creates the entry with `hit_count = 0` |
//! | later request | [`record_hit`](CacheStore::record_hit) bumps `hit_count` and `last_accessed_at` |
//! | duplicate write | [`put`](CacheStore::put) replaces the payload, keeps counters |
//! | invalidation | [`invalidate`](CacheStore::invalidate) deletes entries |

pub mod memory;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// One cached response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    /// Serialized JSON payload, returned byte-for-byte on a hit.
    pub payload: String,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds.
    pub last_accessed_at: i64,
    pub hit_count: i64,
}

/// Entry and hit totals for one fingerprint kind (`retrieve`, `analyze`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub entries: i64,
    pub hits: i64,
}

/// Read-only cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: i64,
    pub total_hits: i64,
    pub by_kind: BTreeMap<String, KindStats>,
}

impl CacheStats {
    /// Build stats from `(fingerprint, hit_count)` pairs.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let mut stats = CacheStats::default();
        for (fingerprint, hits) in rows {
            stats.entries += 1;
            stats.total_hits += hits;
            let kind = stats.by_kind.entry(kind_of(fingerprint).to_string()).or_default();
            kind.entries += 1;
            kind.hits += hits;
        }
        stats
    }
}

/// Kind prefix of a fingerprint (`"retrieve:ab12…"` → `"retrieve"`).
pub fn kind_of(fingerprint: &str) -> &str {
    fingerprint
        .split_once(':')
        .map(|(kind, _)| kind)
        .unwrap_or("other")
}

/// Abstract persistent store behind the response cache.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get`](CacheStore::get) | Read an entry without touching counters |
/// | [`record_hit`](CacheStore::record_hit) | Count a hit and return the entry |
/// | [`put`](CacheStore::put) | Upsert a payload |
/// | [`stats`](CacheStore::stats) | Entry count and aggregate hits |
/// | [`invalidate`](CacheStore::invalidate) | Delete all entries or those with a prefix |
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>>;

    /// Atomically increment `hit_count`, refresh `last_accessed_at`, and
    /// return the updated entry. Returns `None` on a miss.
    async fn record_hit(&self, fingerprint: &str) -> Result<Option<CacheEntry>>;

    /// Insert or replace the payload for `fingerprint`.
    ///
    /// Writes for the same fingerprint are idempotent: the payload is a
    /// deterministic function of the fingerprinted inputs, so the last
    /// writer wins. `created_at` and `hit_count` of an existing entry are
    /// preserved.
    async fn put(&self, fingerprint: &str, payload: &str) -> Result<()>;

    async fn stats(&self) -> Result<CacheStats>;

    /// Delete every entry, or only those whose fingerprint starts with
    /// `prefix`. Returns the number of deleted entries.
    async fn invalidate(&self, prefix: Option<&str>) -> Result<u64>;
}
