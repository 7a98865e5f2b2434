//! Core data models shared by the retrieval and analysis pipeline.
//!
//! These types describe a query as issued by a caller, the chunk records
//! resolved from the metadata store, the fused retrieval result, and the
//! structured overlap/contradiction records produced by the analysis parser.
//! Everything that ends up in a cached payload derives `Serialize` and
//! `Deserialize` so a cache hit can be returned without recomputation.

use serde::{Deserialize, Serialize};

/// Largest `top_k` accepted for a single request.
pub const MAX_TOP_K: usize = 100;

/// Default reciprocal-rank-fusion smoothing constant.
pub const DEFAULT_RRF_K: u32 = 60;

/// Reasons a [`Query`] is rejected before any upstream call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidQuery {
    #[error("query text is empty")]
    EmptyText,

    #[error("top_k must be >= 1")]
    ZeroTopK,

    #[error("top_k must be <= {max}, got {got}")]
    TopKTooLarge { max: usize, got: usize },

    #[error("year filter out of range: {0}")]
    YearOutOfRange(i32),

    #[error("year {year} contradicts min_year {min_year}")]
    ConflictingYears { year: i32, min_year: i32 },
}

/// Metadata filters applied to a retrieval.
///
/// `year`, `doc_type` and `category` are forwarded to the vector index as
/// namespace restricts. `min_year` and known risk categories are enforced
/// again during hydration, where the full chunk record is available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.year.is_none()
            && self.min_year.is_none()
            && self.doc_type.is_none()
            && self.category.is_none()
    }

    /// Trim string filters, lowercase them, and turn blanks into `None`.
    pub fn normalized(&self) -> Filters {
        fn clean(s: &Option<String>) -> Option<String> {
            s.as_deref()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
        }
        Filters {
            year: self.year,
            min_year: self.min_year,
            doc_type: clean(&self.doc_type),
            category: clean(&self.category),
        }
    }

    fn validate(&self) -> Result<(), InvalidQuery> {
        for y in [self.year, self.min_year].into_iter().flatten() {
            if !(1900..=2200).contains(&y) {
                return Err(InvalidQuery::YearOutOfRange(y));
            }
        }
        if let (Some(year), Some(min_year)) = (self.year, self.min_year) {
            if year < min_year {
                return Err(InvalidQuery::ConflictingYears { year, min_year });
            }
        }
        Ok(())
    }
}

/// A single retrieval or analysis request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub filters: Filters,
    pub top_k: usize,
    pub expand: bool,
    pub analyze: bool,
    /// Only report findings between different regulations (analysis only).
    pub cross_regulation_only: bool,
}

impl Query {
    /// Build a retrieval query with default flags.
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Self {
            text: text.into(),
            filters: Filters::default(),
            top_k,
            expand: false,
            analyze: false,
            cross_regulation_only: true,
        }
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_expand(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    pub fn with_analyze(mut self, analyze: bool) -> Self {
        self.analyze = analyze;
        self
    }

    pub fn with_cross_regulation_only(mut self, only: bool) -> Self {
        self.cross_regulation_only = only;
        self
    }

    /// Validate and normalize: collapses whitespace in the text and
    /// cleans up the filters.
    pub fn normalized(&self) -> Result<Query, InvalidQuery> {
        let text = normalize_text(&self.text);
        if text.is_empty() {
            return Err(InvalidQuery::EmptyText);
        }
        if self.top_k == 0 {
            return Err(InvalidQuery::ZeroTopK);
        }
        if self.top_k > MAX_TOP_K {
            return Err(InvalidQuery::TopKTooLarge {
                max: MAX_TOP_K,
                got: self.top_k,
            });
        }
        let filters = self.filters.normalized();
        filters.validate()?;
        Ok(Query {
            text,
            filters,
            ..self.clone()
        })
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One entry of a ranked list returned by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedHit {
    pub chunk_id: String,
    /// Raw similarity in index-specific units; higher is closer.
    pub score: f64,
}

impl RankedHit {
    pub fn new(chunk_id: impl Into<String>, score: f64) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            score,
        }
    }
}

/// Regulatory metadata for one chunk, as produced by the offline pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub regulation_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub full_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paragraph_numbers: Vec<String>,
    /// `[start, end)` character offsets into `full_text`, one per paragraph.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paragraph_indices: Vec<(usize, usize)>,
}

impl ChunkMetadata {
    /// Human-readable citation, e.g. `"CRR - Article 124"`.
    pub fn display_name(&self) -> String {
        let mut parts = Vec::new();
        if !self.regulation_name.is_empty() {
            parts.push(self.regulation_name.clone());
        }
        if let Some(article) = &self.article_number {
            parts.push(format!("Article {}", article));
        }
        if parts.is_empty() {
            "Unknown Regulation".to_string()
        } else {
            parts.join(" - ")
        }
    }

    /// Text of the paragraph at `index`, or `None` when no such range exists.
    pub fn paragraph(&self, index: usize) -> Option<String> {
        let (start, end) = *self.paragraph_indices.get(index)?;
        slice_chars(&self.full_text, start, end)
    }

    /// All paragraphs; the full text when no ranges are recorded.
    /// Malformed ranges are skipped.
    pub fn paragraphs(&self) -> Vec<String> {
        if self.paragraph_indices.is_empty() {
            return vec![self.full_text.clone()];
        }
        self.paragraph_indices
            .iter()
            .filter_map(|&(start, end)| slice_chars(&self.full_text, start, end))
            .collect()
    }
}

fn slice_chars(text: &str, start: usize, end: usize) -> Option<String> {
    if start > end || end > text.chars().count() {
        return None;
    }
    Some(text.chars().skip(start).take(end - start).collect())
}

/// A retrieved chunk after fusion and hydration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    /// Best raw similarity observed across the contributing variants.
    pub similarity_score: f64,
    /// Reciprocal-rank-fusion score.
    pub fused_score: f64,
    pub metadata: ChunkMetadata,
}

/// Ordered chunks for a query, strictly descending by `fused_score`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query: String,
    pub chunks: Vec<Chunk>,
    /// Number of query variants that were searched.
    pub variants: usize,
    /// Fused ids that could not be resolved or were filtered out.
    pub dropped_ids: usize,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// The two regulation citations a finding relates, in citation order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegulationPair(pub String, pub String);

impl RegulationPair {
    /// Both citations sorted, so `(a, b)` and `(b, a)` share an identity.
    pub fn sorted(&self) -> (&str, &str) {
        if self.0 <= self.1 {
            (&self.0, &self.1)
        } else {
            (&self.1, &self.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverlapType {
    Duplicate,
    Complementary,
    Conflicting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// One quoted string per regulation of the pair; absent quotes stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Excerpts {
    pub regulation1: Option<String>,
    pub regulation2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapRecord {
    pub id: String,
    pub regulation_pair: RegulationPair,
    #[serde(rename = "type")]
    pub overlap_type: OverlapType,
    pub description: String,
    pub confidence_score: f64,
    pub excerpts: Excerpts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionRecord {
    pub id: String,
    pub regulation_pair: RegulationPair,
    pub description: String,
    pub severity: Severity,
    pub conflicting_requirements: Excerpts,
}

/// Response of an analysis request.
///
/// The retrieval portion is always present. When the language model call
/// fails or times out, `analysis_available` is false and every analysis
/// field is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub retrieval: RetrievalResult,
    pub analysis_available: bool,
    pub summary: String,
    pub key_findings: Vec<String>,
    pub overlaps: Vec<OverlapRecord>,
    pub contradictions: Vec<ContradictionRecord>,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_analysis: Option<String>,
    /// Findings the parser dropped.
    pub parse_warnings: usize,
}

impl AnalysisResult {
    /// An analysis that could not be produced; keeps the retrieval.
    pub fn unavailable(retrieval: RetrievalResult) -> Self {
        Self {
            retrieval,
            analysis_available: false,
            summary: String::new(),
            key_findings: Vec::new(),
            overlaps: Vec::new(),
            contradictions: Vec::new(),
            recommendations: Vec::new(),
            raw_analysis: None,
            parse_warnings: 0,
        }
    }
}
