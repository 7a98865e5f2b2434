//! Regulatory analysis: prompt construction and response parsing.
//!
//! The language model is asked for five fixed sections (SUMMARY, KEY
//! FINDINGS, CONTRADICTIONS, OVERLAPS, RECOMMENDATIONS). The parser turns
//! its free-form answer into typed [`OverlapRecord`]s and
//! [`ContradictionRecord`]s.
//!
//! ```text
//! chunks ──▶ prompt::analysis_prompt ──▶ LLM ──▶ parser::parse_analysis
//!                                                    │
//!                    split_sections ◀────────────────┘
//!                          │
//!                    split_findings (CONTRADICTIONS / OVERLAPS)
//!                          │
//!            citations · severity/type · quotes · confidence
//!                          │
//!                    record_id (uuid v5)
//! ```
//!
//! Parsing never fails. Findings that cannot be turned into a record are
//! reported as [`ParseWarning`]s and skipped.

pub mod parser;
pub mod prompt;

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{ContradictionRecord, OverlapRecord, RegulationPair};

pub use parser::{parse_analysis, split_findings, split_sections, Sections};
pub use prompt::{analysis_prompt, format_chunks};

/// The five sections of an analysis response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SectionKind {
    Summary,
    KeyFindings,
    Contradictions,
    Overlaps,
    Recommendations,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Summary,
        SectionKind::KeyFindings,
        SectionKind::Contradictions,
        SectionKind::Overlaps,
        SectionKind::Recommendations,
    ];

    /// Header text as it appears in the prompt.
    pub fn header(&self) -> &'static str {
        match self {
            SectionKind::Summary => "SUMMARY",
            SectionKind::KeyFindings => "KEY FINDINGS",
            SectionKind::Contradictions => "CONTRADICTIONS",
            SectionKind::Overlaps => "OVERLAPS",
            SectionKind::Recommendations => "RECOMMENDATIONS",
        }
    }
}

/// Which record a finding produces; part of the record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Overlap,
    Contradiction,
}

impl RecordKind {
    fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Overlap => "overlap",
            RecordKind::Contradiction => "contradiction",
        }
    }
}

const RECORD_NAMESPACE: Uuid = Uuid::from_u128(0x6c65_7866_7573_6500_8000_0000_0000_0001);

/// Deterministic record id.
///
/// A pure function of the regulation pair (sorted, so citation order does
/// not matter), the record kind, and the finding's 1-based position in its
/// section.
pub fn record_id(kind: RecordKind, pair: &RegulationPair, ordinal: usize) -> String {
    let (a, b) = pair.sorted();
    let name = format!(
        "{}\u{1f}{}\u{1f}{}\u{1f}{}",
        kind.as_str(),
        a.to_lowercase(),
        b.to_lowercase(),
        ordinal
    );
    Uuid::new_v5(&RECORD_NAMESPACE, name.as_bytes()).to_string()
}

/// Why a finding was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WarningReason {
    /// Fewer than two distinct regulation citations were found.
    TooFewCitations(usize),
    /// Both citations name the same regulation and only cross-regulation
    /// findings were requested.
    SameRegulation(String),
}

/// A finding the parser dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub section: SectionKind,
    /// 1-based position of the finding in its section.
    pub ordinal: usize,
    pub reason: WarningReason,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            WarningReason::TooFewCitations(n) => write!(
                f,
                "{} finding {}: {} distinct citation(s), need 2",
                self.section.header(),
                self.ordinal,
                n
            ),
            WarningReason::SameRegulation(name) => write!(
                f,
                "{} finding {}: both citations are in {}",
                self.section.header(),
                self.ordinal,
                name
            ),
        }
    }
}

/// Everything extracted from one analysis response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAnalysis {
    pub summary: String,
    pub key_findings: Vec<String>,
    pub contradictions: Vec<ContradictionRecord>,
    pub overlaps: Vec<OverlapRecord>,
    pub recommendations: Vec<String>,
    pub warnings: Vec<ParseWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str) -> RegulationPair {
        RegulationPair(a.to_string(), b.to_string())
    }

    #[test]
    fn test_record_id_is_deterministic() {
        let p = pair("CRR Article 124", "CRD IV Article 79");
        assert_eq!(
            record_id(RecordKind::Contradiction, &p, 1),
            record_id(RecordKind::Contradiction, &p, 1)
        );
    }

    #[test]
    fn test_record_id_ignores_citation_order() {
        assert_eq!(
            record_id(RecordKind::Overlap, &pair("A Article 1", "B Article 2"), 3),
            record_id(RecordKind::Overlap, &pair("B Article 2", "A Article 1"), 3)
        );
    }

    #[test]
    fn test_record_id_varies_by_kind_and_ordinal() {
        let p = pair("A Article 1", "B Article 2");
        let base = record_id(RecordKind::Overlap, &p, 1);
        assert_ne!(base, record_id(RecordKind::Contradiction, &p, 1));
        assert_ne!(base, record_id(RecordKind::Overlap, &p, 2));
    }

    #[test]
    fn test_warning_display() {
        let w = ParseWarning {
            section: SectionKind::Overlaps,
            ordinal: 2,
            reason: WarningReason::TooFewCitations(1),
        };
        assert_eq!(w.to_string(), "OVERLAPS finding 2: 1 distinct citation(s), need 2");
    }
}
