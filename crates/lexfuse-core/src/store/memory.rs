//! In-memory [`CacheStore`] implementation for testing.
//!
//! Uses a `HashMap` behind `std::sync::RwLock`. Every operation takes the
//! lock once, so `record_hit` is atomic with respect to concurrent callers.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use super::{CacheEntry, CacheStats, CacheStore};

/// In-memory cache store.
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().unwrap().get(fingerprint).cloned())
    }

    async fn record_hit(&self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        let mut entries = self.entries.write().unwrap();
        Ok(entries.get_mut(fingerprint).map(|e| {
            e.hit_count += 1;
            e.last_accessed_at = now();
            e.clone()
        }))
    }

    async fn put(&self, fingerprint: &str, payload: &str) -> Result<()> {
        let ts = now();
        let mut entries = self.entries.write().unwrap();
        entries
            .entry(fingerprint.to_string())
            .and_modify(|e| e.payload = payload.to_string())
            .or_insert_with(|| CacheEntry {
                fingerprint: fingerprint.to_string(),
                payload: payload.to_string(),
                created_at: ts,
                last_accessed_at: ts,
                hit_count: 0,
            });
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let entries = self.entries.read().unwrap();
        Ok(CacheStats::from_rows(
            entries.values().map(|e| (e.fingerprint.as_str(), e.hit_count)),
        ))
    }

    async fn invalidate(&self, prefix: Option<&str>) -> Result<u64> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        match prefix {
            Some(p) => entries.retain(|k, _| !k.starts_with(p)),
            None => entries.clear(),
        }
        Ok((before - entries.len()) as u64)
    }
}
