//! `lexfuse parse`: run the analysis parser over a saved model response.

use anyhow::{Context, Result};
use std::path::Path;

use lexfuse_core::analysis::parse_analysis;
use lexfuse_core::models::{AnalysisResult, RetrievalResult};

use crate::analyze_cmd::print_analysis;

pub fn run_parse(path: &Path, cross_regulation_only: bool, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let parsed = parse_analysis(&raw, cross_regulation_only);
    for warning in &parsed.warnings {
        eprintln!("warning: {}", warning);
    }

    let result = AnalysisResult {
        retrieval: RetrievalResult::default(),
        analysis_available: true,
        summary: parsed.summary,
        key_findings: parsed.key_findings,
        overlaps: parsed.overlaps,
        contradictions: parsed.contradictions,
        recommendations: parsed.recommendations,
        raw_analysis: None,
        parse_warnings: parsed.warnings.len(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_analysis(&result);
    }
    Ok(())
}
