//! Vector index abstraction.
//!
//! The nearest-neighbor index is an external collaborator. The engine only
//! needs one operation: given a query embedding, return up to `top_k`
//! `(chunk_id, score)` pairs in descending score order, optionally
//! restricted by namespace filters.
//!
//! [`InMemoryIndex`] is a brute-force cosine implementation used in tests
//! and for small local corpora.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::embedding::cosine_similarity;
use crate::models::{Filters, RankedHit};

/// A namespace restrict: only datapoints whose `namespace` value is in
/// `allow` are eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Restrict {
    pub namespace: String,
    pub allow: Vec<String>,
}

/// Namespace restricts derived from the index-side filters.
///
/// `min_year` is not expressible as an allow-list and is enforced during
/// hydration instead.
pub fn restricts(filters: &Filters) -> Vec<Restrict> {
    let mut out = Vec::new();
    if let Some(year) = filters.year {
        out.push(Restrict {
            namespace: "year".to_string(),
            allow: vec![year.to_string()],
        });
    }
    if let Some(doc_type) = &filters.doc_type {
        out.push(Restrict {
            namespace: "doc_type".to_string(),
            allow: vec![doc_type.clone()],
        });
    }
    if let Some(category) = &filters.category {
        out.push(Restrict {
            namespace: "category".to_string(),
            allow: vec![category.clone()],
        });
    }
    out
}

/// Nearest-neighbor search over chunk embeddings.
///
/// Failures (timeout, quota, index unavailable) are returned as errors and
/// are fatal to the retrieval request; implementations do not retry.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return at most `top_k` hits, descending by score.
    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        filters: &Filters,
    ) -> Result<Vec<RankedHit>>;
}

struct IndexEntry {
    chunk_id: String,
    vector: Vec<f32>,
    namespaces: HashMap<String, String>,
}

/// Brute-force in-memory index.
pub struct InMemoryIndex {
    entries: RwLock<Vec<IndexEntry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Insert or replace a datapoint with its namespace values
    /// (e.g. `[("year", "2016"), ("doc_type", "regulation")]`).
    pub fn insert(&self, chunk_id: &str, vector: Vec<f32>, namespaces: &[(&str, &str)]) {
        let mut entries = self.entries.write().unwrap();
        entries.retain(|e| e.chunk_id != chunk_id);
        entries.push(IndexEntry {
            chunk_id: chunk_id.to_string(),
            vector,
            namespaces: namespaces
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_lowercase()))
                .collect(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn admits(entry: &IndexEntry, restricts: &[Restrict]) -> bool {
    restricts.iter().all(|r| {
        entry
            .namespaces
            .get(&r.namespace)
            .map(|v| r.allow.iter().any(|a| a.eq_ignore_ascii_case(v)))
            .unwrap_or(false)
    })
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        filters: &Filters,
    ) -> Result<Vec<RankedHit>> {
        let restricts = restricts(filters);
        let entries = self.entries.read().unwrap();
        let mut hits: Vec<RankedHit> = entries
            .iter()
            .filter(|e| admits(e, &restricts))
            .map(|e| RankedHit {
                chunk_id: e.chunk_id.clone(),
                score: cosine_similarity(embedding, &e.vector) as f64,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> InMemoryIndex {
        let idx = InMemoryIndex::new();
        idx.insert("a", vec![1.0, 0.0], &[("year", "2016"), ("doc_type", "Regulation")]);
        idx.insert("b", vec![0.7, 0.7], &[("year", "2013"), ("doc_type", "directive")]);
        idx.insert("c", vec![0.0, 1.0], &[("year", "2016")]);
        idx
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let hits = index()
            .search(&[1.0, 0.1], 10, &Filters::default())
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let hits = index()
            .search(&[1.0, 0.1], 1, &Filters::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_namespace_restricts() {
        let filters = Filters {
            year: Some(2016),
            doc_type: Some("regulation".to_string()),
            ..Default::default()
        };
        let hits = index().search(&[0.0, 1.0], 10, &filters).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "a");
    }

    #[tokio::test]
    async fn test_restricts_matching_nothing_is_empty() {
        let filters = Filters {
            year: Some(1999),
            ..Default::default()
        };
        let hits = index().search(&[0.0, 1.0], 10, &filters).await.unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_restricts_skip_min_year() {
        let filters = Filters {
            min_year: Some(2010),
            category: Some("aml_cft".to_string()),
            ..Default::default()
        };
        let r = restricts(&filters);
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].namespace, "category");
    }

    #[test]
    fn test_insert_replaces() {
        let idx = index();
        idx.insert("a", vec![0.0, 1.0], &[]);
        assert_eq!(idx.len(), 3);
    }
}
