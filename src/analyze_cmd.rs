//! `lexfuse analyze`: retrieval plus overlap/contradiction analysis.

use anyhow::Result;

use lexfuse_core::models::{AnalysisResult, Excerpts, Query};

use crate::bootstrap;
use crate::config::Config;
use crate::retrieve::print_retrieval;

pub async fn run_analyze(config: &Config, query: Query, json: bool) -> Result<()> {
    let engine = bootstrap::build_engine(config).await?;

    if json {
        println!("{}", engine.analyze_payload(&query).await?);
        return Ok(());
    }

    let result = engine.analyze(&query).await?;
    print_retrieval(&result.retrieval);
    print_analysis(&result);
    Ok(())
}

pub fn print_analysis(result: &AnalysisResult) {
    println!("Analysis");
    println!("========");
    if !result.analysis_available {
        println!("  (analysis unavailable)");
        return;
    }

    if !result.summary.is_empty() {
        println!();
        println!("{}", result.summary);
    }

    if !result.key_findings.is_empty() {
        println!();
        println!("Key findings:");
        for finding in &result.key_findings {
            println!("  - {}", finding);
        }
    }

    println!();
    println!("Contradictions: {}", result.contradictions.len());
    for (i, c) in result.contradictions.iter().enumerate() {
        println!(
            "  {}. [{:?}] {} vs {}",
            i + 1,
            c.severity,
            c.regulation_pair.0,
            c.regulation_pair.1
        );
        println!("     {}", c.description);
        print_excerpts(&c.conflicting_requirements);
    }

    println!();
    println!("Overlaps: {}", result.overlaps.len());
    for (i, o) in result.overlaps.iter().enumerate() {
        println!(
            "  {}. [{:?}, {:.0}%] {} & {}",
            i + 1,
            o.overlap_type,
            o.confidence_score * 100.0,
            o.regulation_pair.0,
            o.regulation_pair.1
        );
        println!("     {}", o.description);
        print_excerpts(&o.excerpts);
    }

    if !result.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for r in &result.recommendations {
            println!("  - {}", r);
        }
    }

    if result.parse_warnings > 0 {
        println!();
        println!("({} finding(s) could not be parsed)", result.parse_warnings);
    }
}

fn print_excerpts(excerpts: &Excerpts) {
    if let Some(q) = &excerpts.regulation1 {
        println!("     > \"{}\"", q);
    }
    if let Some(q) = &excerpts.regulation2 {
        println!("     > \"{}\"", q);
    }
}
