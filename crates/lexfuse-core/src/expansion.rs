//! Query expansion helpers.
//!
//! Builds the prompt that asks a text generator for alternate phrasings of
//! a query, parses its response, and merges the phrasings behind the
//! original. The async call itself (with its timeout) lives in the app
//! crate; everything here is pure.

use crate::models::normalize_text;

/// Build the expansion prompt for `n` alternate phrasings.
pub fn expansion_prompt(query: &str, n: usize) -> String {
    format!(
        "Generate {n} alternative phrasings of the following search query for EU legislation.\n\
         Keep the core intent but vary the wording, terminology, and perspective.\n\
         Focus on regulatory and legal terminology variations.\n\n\
         Original query: \"{query}\"\n\n\
         Respond with ONLY a JSON array of {n} strings, or one phrasing per line, \
         without numbering or explanation."
    )
}

/// Extract phrasings from a generator response.
///
/// Accepts a JSON array of strings (optionally wrapped in prose or a code
/// fence) or plain text with one phrasing per line. List markers and
/// surrounding quotes are stripped from plain lines.
pub fn parse_variants(content: &str) -> Vec<String> {
    if let (Some(start), Some(end)) = (content.find('['), content.rfind(']')) {
        if start < end {
            if let Ok(items) = serde_json::from_str::<Vec<String>>(&content[start..=end]) {
                return items
                    .iter()
                    .map(|s| normalize_text(s))
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("```"))
        .map(|line| {
            let line = line
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches(['.', ')', '-', '*', '•'])
                .trim()
                .trim_matches(['"', '\'', '`']);
            normalize_text(line)
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Put `original` first and append distinct candidates until `variants`
/// strings are collected. Comparison is case-insensitive.
pub fn merge_variants(original: &str, candidates: Vec<String>, variants: usize) -> Vec<String> {
    let mut out = vec![original.to_string()];
    for candidate in candidates {
        if out.len() >= variants.max(1) {
            break;
        }
        if !out.iter().any(|v| v.eq_ignore_ascii_case(&candidate)) {
            out.push(candidate);
        }
    }
    out
}
