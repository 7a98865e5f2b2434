//! HTTP nearest-neighbor client.
//!
//! Speaks a small JSON protocol to a vector search endpoint:
//!
//! ```text
//! POST <index.url>
//! { "embedding": [..], "top_k": 30,
//!   "restricts": [{ "namespace": "year", "allow": ["2016"] }] }
//!
//! 200 OK
//! { "neighbors": [{ "id": "chunk-17", "distance": 0.82 }, ..] }
//! ```
//!
//! `distance` is a dot-product similarity: higher is closer. Failures are
//! returned as-is; this client never retries.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lexfuse_core::index::{restricts, Restrict, VectorIndex};
use lexfuse_core::models::{Filters, RankedHit};

use crate::config::IndexConfig;
use crate::http;

#[derive(Serialize)]
struct SearchRequest<'a> {
    embedding: &'a [f32],
    top_k: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    restricts: Vec<Restrict>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    neighbors: Vec<Neighbor>,
}

#[derive(Deserialize)]
struct Neighbor {
    #[serde(alias = "datapoint_id")]
    id: String,
    #[serde(alias = "score")]
    distance: f64,
}

pub struct HttpVectorIndex {
    url: String,
    client: reqwest::Client,
}

impl HttpVectorIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let Some(url) = config.url.clone() else {
            bail!("index.url must be set to run searches");
        };
        // Outer per-variant timeout in the engine is authoritative.
        let client = http::client(config.timeout_secs.unwrap_or(30))?;
        Ok(Self { url, client })
    }
}

/// Sort descending by score and cap at `top_k`, whatever order the server
/// used.
fn into_hits(response: SearchResponse, top_k: usize) -> Vec<RankedHit> {
    let mut hits: Vec<RankedHit> = response
        .neighbors
        .into_iter()
        .map(|n| RankedHit::new(n.id, n.distance))
        .collect();
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);
    hits
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        filters: &Filters,
    ) -> Result<Vec<RankedHit>> {
        let body = SearchRequest {
            embedding,
            top_k,
            restricts: restricts(filters),
        };
        let json = http::post_json(&self.client, &self.url, None, &body, 0, "vector index").await?;
        let response: SearchResponse = serde_json::from_value(json)?;
        Ok(into_hits(response, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let filters = Filters {
            year: Some(2016),
            ..Default::default()
        };
        let body = SearchRequest {
            embedding: &[0.5, 1.0],
            top_k: 3,
            restricts: restricts(&filters),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["top_k"], 3);
        assert_eq!(json["restricts"][0]["namespace"], "year");
        assert_eq!(json["restricts"][0]["allow"][0], "2016");
    }

    #[test]
    fn test_request_omits_empty_restricts() {
        let body = SearchRequest {
            embedding: &[1.0],
            top_k: 1,
            restricts: Vec::new(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("restricts").is_none());
    }

    #[test]
    fn test_response_sorted_and_truncated() {
        let response: SearchResponse = serde_json::from_value(serde_json::json!({
            "neighbors": [
                {"id": "a", "distance": 0.2},
                {"datapoint_id": "b", "score": 0.9},
                {"id": "c", "distance": 0.5}
            ]
        }))
        .unwrap();
        let hits = into_hits(response, 2);
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_missing_url_is_error() {
        assert!(HttpVectorIndex::new(&IndexConfig::default()).is_err());
    }
}
