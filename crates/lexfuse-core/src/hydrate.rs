//! Hydration: fused ids → full chunks.
//!
//! Resolves each fused id against the metadata returned by a
//! [`MetadataStore`](crate::metadata::MetadataStore) lookup, preserving fused
//! order. Ids without a record are dropped with a warning; so are chunks
//! rejected by the post-search filters (`min_year`, risk category). A result
//! where every id is dropped is empty, not an error.

use std::collections::HashMap;

use crate::fusion::FusedHit;
use crate::models::{Chunk, ChunkMetadata, Filters};
use crate::risk;

/// Outcome of hydrating one fused ranking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hydrated {
    pub chunks: Vec<Chunk>,
    /// Ids with no metadata record.
    pub missing: Vec<String>,
    /// Ids resolved but rejected by a filter.
    pub filtered: Vec<String>,
}

impl Hydrated {
    pub fn dropped(&self) -> usize {
        self.missing.len() + self.filtered.len()
    }
}

/// Whether a resolved chunk passes the hydration-side filters.
pub fn admits(filters: &Filters, meta: &ChunkMetadata) -> bool {
    if let (Some(min), Some(year)) = (filters.min_year, meta.year) {
        if year < min {
            return false;
        }
    }
    if let Some(category) = &filters.category {
        if !risk::matches(category, &meta.full_text, &meta.regulation_name) {
            return false;
        }
    }
    true
}

/// Join fused hits with their metadata, keeping fused order.
pub fn hydrate(
    fused: &[FusedHit],
    mut records: HashMap<String, ChunkMetadata>,
    filters: &Filters,
) -> Hydrated {
    let mut out = Hydrated::default();
    for hit in fused {
        let Some(meta) = records.remove(&hit.chunk_id) else {
            out.missing.push(hit.chunk_id.clone());
            continue;
        };
        if !admits(filters, &meta) {
            out.filtered.push(hit.chunk_id.clone());
            continue;
        }
        out.chunks.push(Chunk {
            id: hit.chunk_id.clone(),
            similarity_score: hit.best_similarity,
            fused_score: hit.fused_score,
            metadata: meta,
        });
    }

    if !out.missing.is_empty() {
        tracing::warn!(
            missing = out.missing.len(),
            resolved = out.chunks.len(),
            "metadata missing for some chunk ids"
        );
    }
    if !out.filtered.is_empty() {
        tracing::debug!(filtered = out.filtered.len(), "chunks removed by filters");
    }
    out
}
