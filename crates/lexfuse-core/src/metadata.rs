//! Chunk metadata lookup.
//!
//! The metadata store maps stable chunk ids to their text and regulatory
//! metadata. It is read-only from the engine's perspective and consulted in
//! bulk once per retrieval, after fusion.
//!
//! Records are produced by the offline pipeline as JSON lines; see
//! [`parse_record`] for the accepted shape.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::ChunkMetadata;

/// Bulk id → metadata lookup.
///
/// Ids with no record are simply absent from the returned map; a miss is
/// not an error.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn lookup(&self, ids: &[String]) -> Result<HashMap<String, ChunkMetadata>>;
}

/// `HashMap`-backed metadata store.
pub struct InMemoryMetadataStore {
    records: RwLock<HashMap<String, ChunkMetadata>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, id: impl Into<String>, meta: ChunkMetadata) {
        self.records.write().unwrap().insert(id.into(), meta);
    }

    pub fn get(&self, id: &str) -> Option<ChunkMetadata> {
        self.records.read().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn lookup(&self, ids: &[String]) -> Result<HashMap<String, ChunkMetadata>> {
        let records = self.records.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id).map(|m| (id.clone(), m.clone())))
            .collect())
    }
}

#[derive(Deserialize)]
struct RawRecord {
    id: Option<String>,
    document_id: Option<serde_json::Value>,
    chunk_id: Option<serde_json::Value>,
    #[serde(flatten)]
    meta: RawMeta,
}

#[derive(Deserialize)]
struct RawMeta {
    #[serde(default)]
    regulation_name: Option<String>,
    #[serde(default)]
    article_number: Option<serde_json::Value>,
    #[serde(default)]
    year: Option<serde_json::Value>,
    #[serde(default)]
    doc_type: Option<String>,
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    paragraph_numbers: Vec<serde_json::Value>,
    #[serde(default)]
    paragraph_indices: Vec<(usize, usize)>,
}

fn scalar_to_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse one JSON line of processed-chunk output into `(id, metadata)`.
///
/// The id is taken from `id`, or built as `"{document_id}_{chunk_id}"`.
/// `year` and `article_number` may be strings or numbers; placeholder
/// values such as `"None"` and `"Unknown"` are dropped.
pub fn parse_record(line: &str) -> Result<(String, ChunkMetadata)> {
    let raw: RawRecord = serde_json::from_str(line)?;

    let id = match (raw.id, &raw.document_id, &raw.chunk_id) {
        (Some(id), _, _) if !id.is_empty() => id,
        (_, Some(doc), Some(chunk)) => format!(
            "{}_{}",
            scalar_to_string(doc).unwrap_or_default(),
            scalar_to_string(chunk).unwrap_or_default()
        ),
        _ => return Err(anyhow!("record has neither id nor document_id/chunk_id")),
    };

    let clean = |s: Option<String>| s.filter(|v| !v.is_empty() && v != "None" && v != "Unknown");

    let year = raw.meta.year.as_ref().and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_i64().map(|y| y as i32),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    let meta = ChunkMetadata {
        regulation_name: clean(raw.meta.regulation_name).unwrap_or_default(),
        article_number: clean(raw.meta.article_number.as_ref().and_then(scalar_to_string)),
        year,
        doc_type: clean(raw.meta.doc_type),
        full_text: raw.meta.full_text.unwrap_or_default(),
        paragraph_numbers: raw
            .meta
            .paragraph_numbers
            .iter()
            .filter_map(scalar_to_string)
            .collect(),
        paragraph_indices: raw.meta.paragraph_indices,
    };

    Ok((id, meta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_skips_missing() {
        let store = InMemoryMetadataStore::new();
        store.insert("a", ChunkMetadata::default());
        let found = store
            .lookup(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("a"));
    }

    #[test]
    fn test_parse_record_with_id() {
        let line = r#"{"id":"c1","regulation_name":"CRR","article_number":124,"year":"2013","doc_type":"regulation","full_text":"Text","paragraph_numbers":[1,"2"],"paragraph_indices":[[0,2],[2,4]]}"#;
        let (id, meta) = parse_record(line).unwrap();
        assert_eq!(id, "c1");
        assert_eq!(meta.regulation_name, "CRR");
        assert_eq!(meta.article_number.as_deref(), Some("124"));
        assert_eq!(meta.year, Some(2013));
        assert_eq!(meta.paragraph_numbers, vec!["1", "2"]);
        assert_eq!(meta.paragraph_indices, vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn test_parse_record_composite_id() {
        let line = r#"{"document_id":"32013R0575","chunk_id":7,"doc_type":"Unknown","full_text":"x"}"#;
        let (id, meta) = parse_record(line).unwrap();
        assert_eq!(id, "32013R0575_7");
        assert_eq!(meta.doc_type, None);
    }

    #[test]
    fn test_parse_record_without_id_fails() {
        assert!(parse_record(r#"{"full_text":"x"}"#).is_err());
        assert!(parse_record("not json").is_err());
    }
}
