//! `lexfuse retrieve`: fused retrieval from the command line.

use anyhow::Result;

use lexfuse_core::models::{Query, RetrievalResult};

use crate::bootstrap;
use crate::config::Config;

/// Characters of chunk text shown per result.
const EXCERPT_CHARS: usize = 240;

pub async fn run_retrieve(config: &Config, query: Query, json: bool) -> Result<()> {
    let engine = bootstrap::build_engine(config).await?;

    if json {
        // Print the cached payload as-is.
        println!("{}", engine.retrieve_payload(&query).await?);
        return Ok(());
    }

    let result = engine.retrieve(&query).await?;
    print_retrieval(&result);
    Ok(())
}

pub fn print_retrieval(result: &RetrievalResult) {
    if result.is_empty() {
        println!("No results.");
        return;
    }

    println!(
        "\"{}\" ({} variant{}, {} dropped)",
        result.query,
        result.variants,
        if result.variants == 1 { "" } else { "s" },
        result.dropped_ids
    );
    println!();

    for (i, chunk) in result.chunks.iter().enumerate() {
        let meta = &chunk.metadata;
        println!(
            "{}. [{:.4}] {}",
            i + 1,
            chunk.fused_score,
            meta.display_name()
        );
        println!(
            "    year: {} | type: {} | similarity: {:.3}",
            meta.year.map(|y| y.to_string()).unwrap_or_else(|| "-".into()),
            meta.doc_type.as_deref().unwrap_or("-"),
            chunk.similarity_score
        );
        println!("    excerpt: \"{}\"", excerpt(&meta.full_text));
        println!("    id: {}", chunk.id);
        println!();
    }
}

fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat.to_string();
    }
    let head: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{}…", head.trim_end())
}
