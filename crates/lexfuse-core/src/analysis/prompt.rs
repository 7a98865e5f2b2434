//! Analysis prompt construction.

use crate::models::Chunk;

/// Characters of chunk text included per chunk.
pub const CHUNK_TEXT_LIMIT: usize = 800;

/// Render chunks as numbered, cited context blocks.
///
/// ```text
/// [CHUNK 1] CRR | Article 124 | Paragraphs 1, 2
/// Year: 2013 | Type: regulation
/// Similarity: 0.873
///
/// <text, truncated to 800 characters>
/// ```
pub fn format_chunks(chunks: &[Chunk], max_chunks: usize) -> String {
    let rule = "─".repeat(80);
    chunks
        .iter()
        .take(max_chunks)
        .enumerate()
        .map(|(i, chunk)| {
            let meta = &chunk.metadata;
            let mut citation = Vec::new();
            if !meta.regulation_name.is_empty() {
                citation.push(meta.regulation_name.clone());
            }
            if let Some(article) = &meta.article_number {
                citation.push(format!("Article {}", article));
            }
            if !meta.paragraph_numbers.is_empty() {
                citation.push(format!("Paragraphs {}", meta.paragraph_numbers.join(", ")));
            }
            let citation = if citation.is_empty() {
                "Unknown Source".to_string()
            } else {
                citation.join(" | ")
            };

            let text = if meta.full_text.is_empty() {
                "No text available".to_string()
            } else if meta.full_text.chars().count() > CHUNK_TEXT_LIMIT {
                let head: String = meta.full_text.chars().take(CHUNK_TEXT_LIMIT).collect();
                format!("{}...", head)
            } else {
                meta.full_text.clone()
            };

            format!(
                "[CHUNK {}] {}\nYear: {} | Type: {}\nSimilarity: {:.3}\n\n{}\n{}\n",
                i + 1,
                citation,
                meta.year.map(|y| y.to_string()).unwrap_or_else(|| "N/A".into()),
                meta.doc_type.as_deref().unwrap_or("Unknown"),
                chunk.similarity_score,
                text,
                rule
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the single analysis prompt for `query` over `chunks`.
pub fn analysis_prompt(
    query: &str,
    chunks: &[Chunk],
    max_chunks: usize,
    cross_regulation_only: bool,
) -> String {
    let (scope, contradiction_rule, overlap_rule) = if cross_regulation_only {
        (
            "IMPORTANT: Focus ONLY on contradictions and overlaps BETWEEN DIFFERENT regulations.\n\
             Do NOT report contradictions or overlaps between articles within the SAME regulation.\n\n",
            "Identify contradictions ONLY between DIFFERENT regulations",
            "Find overlapping regulatory scope ONLY between DIFFERENT regulations",
        )
    } else {
        (
            "",
            "Identify any direct contradictions between articles or regulations",
            "Find overlapping regulatory scope or requirements",
        )
    };

    format!(
        "You are a regulatory compliance analyst specializing in EU legislation for financial institutions.\n\n\
         TASK: Analyze the following regulations for overlaps, contradictions, and relationships relevant to the query.\n\n\
         {scope}\
         USER QUERY: {query}\n\n\
         RELEVANT REGULATIONS:\n{context}\n\
         ANALYSIS INSTRUCTIONS:\n\
         1. {contradiction_rule}\n\
         2. {overlap_rule}\n\
         3. Highlight ambiguous areas requiring legal interpretation\n\
         4. Note complementary relationships between regulations\n\n\
         For each contradiction or overlap, write one numbered item that:\n\
         - starts with both citations as \"<Regulation> Article <n> vs <Regulation> Article <n>\"\n\
         - quotes the relevant text of each regulation in quotation marks, in citation order\n\
         - explains the relationship\n\
         - for contradictions, states \"Severity: CRITICAL / HIGH / MEDIUM / LOW\"\n\
         - for overlaps, states \"Type: DUPLICATE / COMPLEMENTARY / CONFLICTING\" and \"Confidence: <percent>\"\n\n\
         OUTPUT FORMAT: use exactly these section headings, in this order:\n\
         SUMMARY\n\
         KEY FINDINGS\n\
         CONTRADICTIONS\n\
         OVERLAPS\n\
         RECOMMENDATIONS\n\n\
         Write \"None identified\" under a section with no items. Be precise and cite specific articles.\n",
        context = format_chunks(chunks, max_chunks),
    )
}
