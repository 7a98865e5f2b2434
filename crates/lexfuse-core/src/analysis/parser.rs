//! Lenient parser for free-form analysis responses.
//!
//! # Grammar
//!
//! ```text
//! response := preamble? (header body)*
//! header   := ["#"…] ["**"] [n "."] NAME ["(…)"] ["**"] [":" inline-body]
//! NAME     := SUMMARY | KEY FINDINGS | CONTRADICTIONS | OVERLAPS | RECOMMENDATIONS
//! body     := preamble? finding*
//! finding  := marker text continuation-line*        marker := "1." | "2)" | "- 3." …
//! ```
//!
//! Headers are matched per line, case-insensitively. An indented line is a
//! header only with a `#` marker; otherwise it continues the current
//! finding. The first occurrence of a section wins; later repeats are
//! ignored. Anything that does not fit
//! the grammar is skipped rather than rejected.
//!
//! Within a finding:
//!
//! | Field | Rule |
//! |-------|------|
//! | citations | `<Name> Article <n>` or `Article <n> of <Name>`; first two distinct |
//! | severity | `Severity: X` label, else first CRITICAL/HIGH/MEDIUM/LOW; default Medium |
//! | overlap type | `Type: X` label, else first DUPLICATE/COMPLEMENTARY/CONFLICTING; default Complementary |
//! | excerpts | quoted strings in order of appearance (`"…"`, `“…”`, `‘…’`, `'…'`) |
//! | confidence | `Confidence: X` label, else first percentage or decimal; default 0.75 |

use std::sync::LazyLock;

use regex::Regex;

use super::{record_id, ParseWarning, ParsedAnalysis, RecordKind, SectionKind, WarningReason};
use crate::models::{
    normalize_text, ContradictionRecord, Excerpts, OverlapRecord, OverlapType, RegulationPair,
    Severity,
};

/// Confidence assigned to an overlap that states none.
pub const DEFAULT_CONFIDENCE: f64 = 0.75;

/// Longest regulation name, in tokens, recognised before `Article`.
const MAX_NAME_TOKENS: usize = 8;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:[ \t]*#{1,6}\s*)?(?:(?:\*\*|__)\s*)?(?:\d{1,2}[.)]\s*)?(?:(?:\*\*|__)\s*)?(SUMMARY|KEY[ _]+FINDINGS|CONTRADICTIONS|OVERLAPS|RECOMMENDATIONS)\s*(?:\([^)]*\))?\s*(?:\*\*|__)?\s*(?::\s*(?:\*\*|__)?\s*(.*?))?\s*$",
    )
    .unwrap()
});

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:#{1,6}\s*)?(?:[-*•]\s*)?(\d{1,3})[.)]\s+(.*)$").unwrap()
});

static NONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\W*(?:none\b|no\s+(?:\w+\s+)?(?:contradictions|overlaps|conflicts|findings|recommendations)\b|n/a\b)",
    )
    .unwrap()
});

static ARTICLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:articles?|art\.)[ \t]*(\d+[a-z]?(?:\(\d+[a-z]?\))*)").unwrap()
});

static OF_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[ \t]+of[ \t]+(?:the[ \t]+)?((?:[a-z]?[A-Z][A-Za-z0-9/\-]*|\([A-Za-z]+\))(?:[ \t]+(?:[a-z]?[A-Z][A-Za-z0-9/\-]*|\([A-Za-z]+\)|No\.?|\d[A-Za-z0-9/\-]*)){0,7})",
    )
    .unwrap()
});

static NAME_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z]?[A-Z][A-Za-z0-9/\-]*|\([A-Za-z]+\)|No\.?|of|\d[A-Za-z0-9/\-]*)$").unwrap()
});

static NAME_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Z]|\(|[a-z][A-Z])").unwrap());

static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"\n]{3,})"|“([^”\n]{3,})”|‘([^’\n]{3,})’|\B'([^'\n]{3,})'\B"#).unwrap()
});

static SEVERITY_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bseverity(?:[ \t]+level)?[ \t]*[:=\-–—]?[ \t]*\(?(critical|high|medium|low)\b")
        .unwrap()
});

static SEVERITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(critical|high|medium|low)\b").unwrap());

static TYPE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:overlap[ \t]+)?type[ \t]*[:=\-–—]?[ \t]*\(?(duplicate|duplicative|duplication|complementary|conflicting)\b",
    )
    .unwrap()
});

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(duplicate|duplicative|duplication|complementary|conflicting)\b").unwrap()
});

static CONFIDENCE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bconfidence(?:[ \t]+(?:score|level))?[ \t]*[:=\-–—]?[ \t]*(\d{1,3}(?:\.\d+)?)[ \t]*(%)?",
    )
    .unwrap()
});

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)[ \t]*%").unwrap());

static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(0\.\d+|1\.0+)\b").unwrap());

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:severity(?:[ \t]+level)?|(?:overlap[ \t]+)?type|confidence(?:[ \t]+(?:score|level))?)[ \t]*[:=][ \t]*\(?[\w.]+%?\)?",
    )
    .unwrap()
});

static EMPTY_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9 ()/]{1,40}:$").unwrap());

/// Words that may precede a regulation name but are not part of it.
const LEADING_STOPWORDS: &[&str] = &[
    "The", "Under", "Both", "While", "Whilst", "Whereas", "In", "Per", "And", "Also", "However",
    "But", "This", "That", "These", "Those", "Pursuant", "According", "See", "Meanwhile",
    "Similarly", "Additionally", "Where", "When", "If", "As", "By", "For", "From", "To", "With",
    "Vs", "Versus", "Between", "Compare", "Contradiction", "Overlap", "Conflict", "Note",
];

// ============ Sections ============

/// Borrowed section bodies of one response. Absent sections are `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sections<'a> {
    pub summary: Option<&'a str>,
    pub key_findings: Option<&'a str>,
    pub contradictions: Option<&'a str>,
    pub overlaps: Option<&'a str>,
    pub recommendations: Option<&'a str>,
}

impl<'a> Sections<'a> {
    pub fn get(&self, kind: SectionKind) -> Option<&'a str> {
        match kind {
            SectionKind::Summary => self.summary,
            SectionKind::KeyFindings => self.key_findings,
            SectionKind::Contradictions => self.contradictions,
            SectionKind::Overlaps => self.overlaps,
            SectionKind::Recommendations => self.recommendations,
        }
    }

    fn fill(&mut self, kind: SectionKind, body: &'a str) {
        let slot = match kind {
            SectionKind::Summary => &mut self.summary,
            SectionKind::KeyFindings => &mut self.key_findings,
            SectionKind::Contradictions => &mut self.contradictions,
            SectionKind::Overlaps => &mut self.overlaps,
            SectionKind::Recommendations => &mut self.recommendations,
        };
        if slot.is_none() {
            *slot = Some(body.trim());
        }
    }
}

fn section_kind(name: &str) -> SectionKind {
    match normalize_text(&name.replace('_', " ")).to_uppercase().as_str() {
        "SUMMARY" => SectionKind::Summary,
        "KEY FINDINGS" => SectionKind::KeyFindings,
        "CONTRADICTIONS" => SectionKind::Contradictions,
        "OVERLAPS" => SectionKind::Overlaps,
        _ => SectionKind::Recommendations,
    }
}

/// Split a response into its section bodies.
///
/// A body runs from the end of its header line (or from the inline text
/// after `HEADER:`) to the next header line.
pub fn split_sections(raw: &str) -> Sections<'_> {
    let mut sections = Sections::default();
    let mut current: Option<(SectionKind, usize)> = None;
    let mut offset = 0;

    for line in raw.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        if let Some(caps) = HEADER_RE.captures(content) {
            if let Some((kind, start)) = current.take() {
                sections.fill(kind, &raw[start..offset]);
            }
            let body_start = match caps.get(2) {
                Some(inline) if !inline.as_str().is_empty() => offset + inline.start(),
                _ => offset + line.len(),
            };
            current = Some((section_kind(&caps[1]), body_start));
        }
        offset += line.len();
    }
    if let Some((kind, start)) = current {
        sections.fill(kind, &raw[start..]);
    }
    sections
}

// ============ Findings ============

/// Split a section body into numbered findings.
///
/// Bold markers are removed. Lines that do not start with an ordinal
/// marker are appended to the current finding; lines before the first
/// marker are ignored.
pub fn split_findings(body: &str) -> Vec<String> {
    let body = body.replace("**", "");
    let mut findings: Vec<String> = Vec::new();
    for line in body.lines() {
        if let Some(caps) = MARKER_RE.captures(line) {
            findings.push(caps[2].trim().to_string());
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(current) = findings.last_mut() {
            current.push('\n');
            current.push_str(line);
        }
    }
    findings
}

/// Whether a section body states that it has no items.
pub fn is_none_identified(body: &str) -> bool {
    NONE_RE.is_match(body.trim())
}

/// Findings of a CONTRADICTIONS/OVERLAPS body. An unnumbered body that is
/// not a "None identified" marker is treated as a single finding.
fn section_findings(body: &str) -> Vec<String> {
    let findings = split_findings(body);
    if !findings.is_empty() || body.trim().is_empty() || is_none_identified(body) {
        return findings;
    }
    vec![body.replace("**", "").trim().to_string()]
}

/// Items of a KEY FINDINGS/RECOMMENDATIONS body: numbered items, else
/// bullet or plain lines.
fn list_items(body: &str) -> Vec<String> {
    if body.trim().is_empty() || is_none_identified(body) {
        return Vec::new();
    }
    let numbered = split_findings(body);
    if !numbered.is_empty() {
        return numbered.iter().map(|f| normalize_text(f)).collect();
    }
    body.replace("**", "")
        .lines()
        .map(|l| normalize_text(l.trim().trim_start_matches(['-', '*', '•'])))
        .filter(|l| !l.is_empty())
        .collect()
}

// ============ Field extraction ============

/// A `<Name> Article <n>` citation found in a finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub regulation: String,
    pub article: String,
    /// Byte offset just past the citation.
    pub end: usize,
}

impl Citation {
    pub fn render(&self) -> String {
        format!("{} Article {}", self.regulation, self.article)
    }
}

/// Regulation name directly before an `Article` mention, scanning back
/// over name-shaped tokens on the same line.
fn name_before(prefix: &str) -> Option<String> {
    if !prefix.ends_with([' ', '\t']) {
        return None;
    }
    let line = prefix.trim_end().rsplit('\n').next().unwrap_or("");
    let mut tokens: Vec<&str> = line
        .split_whitespace()
        .rev()
        .take_while(|t| NAME_TOKEN_RE.is_match(t))
        .take(MAX_NAME_TOKENS)
        .collect();
    tokens.reverse();

    let start = tokens.iter().position(|t| {
        NAME_START_RE.is_match(t) && !matches!(*t, "No" | "No.")
            && !LEADING_STOPWORDS.iter().any(|w| w.eq_ignore_ascii_case(t))
    })?;
    Some(tokens[start..].join(" "))
}

/// All citations in `text`, in order of appearance.
pub fn extract_citations(text: &str) -> Vec<Citation> {
    let mut out = Vec::new();
    let mut prev_end = 0;
    for caps in ARTICLE_RE.captures_iter(text) {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() < prev_end {
            continue;
        }
        let article = number.as_str().to_string();

        if let Some(regulation) = name_before(&text[prev_end..whole.start()]) {
            out.push(Citation {
                regulation,
                article,
                end: whole.end(),
            });
            prev_end = whole.end();
        } else if let Some(of) = OF_NAME_RE.captures(&text[whole.end()..]) {
            let end = whole.end() + of.get(0).map(|m| m.end()).unwrap_or(0);
            out.push(Citation {
                regulation: of[1].to_string(),
                article,
                end,
            });
            prev_end = end;
        } else {
            prev_end = whole.end();
        }
    }
    out
}

/// First two distinct citations (case-insensitive), in citation order.
fn citation_pair(text: &str) -> Result<(Citation, Citation), WarningReason> {
    let mut distinct: Vec<Citation> = Vec::new();
    for c in extract_citations(text) {
        let rendered = c.render().to_lowercase();
        if !distinct.iter().any(|d| d.render().to_lowercase() == rendered) {
            distinct.push(c);
        }
        if distinct.len() == 2 {
            break;
        }
    }
    match <[Citation; 2]>::try_from(distinct) {
        Ok([a, b]) => Ok((a, b)),
        Err(found) => Err(WarningReason::TooFewCitations(found.len())),
    }
}

/// Quoted excerpts in order of appearance.
pub fn extract_quotes(text: &str) -> Vec<String> {
    QUOTE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .next()
                .map(|m| normalize_text(m.as_str()))
        })
        .filter(|q| !q.is_empty())
        .collect()
}

fn strip_quotes(text: &str) -> String {
    QUOTE_RE.replace_all(text, " ").into_owned()
}

fn parse_severity(unquoted: &str) -> Severity {
    let word = SEVERITY_LABEL_RE
        .captures(unquoted)
        .or_else(|| SEVERITY_RE.captures(unquoted))
        .map(|c| c[1].to_lowercase());
    match word.as_deref() {
        Some("critical") => Severity::Critical,
        Some("high") => Severity::High,
        Some("low") => Severity::Low,
        _ => Severity::Medium,
    }
}

fn parse_overlap_type(unquoted: &str) -> OverlapType {
    let word = TYPE_LABEL_RE
        .captures(unquoted)
        .or_else(|| TYPE_RE.captures(unquoted))
        .map(|c| c[1].to_lowercase());
    match word.as_deref() {
        Some(w) if w.starts_with("duplicat") => OverlapType::Duplicate,
        Some("conflicting") => OverlapType::Conflicting,
        _ => OverlapType::Complementary,
    }
}

/// Confidence in `[0, 1]`. Values above 1 or followed by `%` are read as
/// percentages.
pub fn parse_confidence(unquoted: &str) -> f64 {
    let value = if let Some(c) = CONFIDENCE_LABEL_RE.captures(unquoted) {
        c[1].parse::<f64>().ok().map(|v| {
            if c.get(2).is_some() || v > 1.0 {
                v / 100.0
            } else {
                v
            }
        })
    } else if let Some(c) = PERCENT_RE.captures(unquoted) {
        c[1].parse::<f64>().ok().map(|v| v / 100.0)
    } else {
        DECIMAL_RE
            .captures(unquoted)
            .and_then(|c| c[1].parse::<f64>().ok())
    };
    value
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE)
}

/// Explanation text following the citation pair, without quotes, labels
/// and separators. Falls back to the whole finding.
fn describe(finding: &str, tail: &str) -> String {
    let cleaned = LABEL_RE.replace_all(&strip_quotes(tail), " ").into_owned();
    let kept: Vec<&str> = cleaned
        .lines()
        .map(|l| l.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|l| !l.is_empty() && !EMPTY_LABEL_RE.is_match(l))
        .collect();
    let text = kept
        .join(" ")
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .collect::<Vec<_>>()
        .join(" ");
    if text.chars().count() >= 3 {
        text
    } else {
        normalize_text(finding)
    }
}

// ============ Records ============

struct Finding {
    pair: RegulationPair,
    quotes: Vec<String>,
    unquoted: String,
    description: String,
}

fn read_finding(text: &str, cross_regulation_only: bool) -> Result<Finding, WarningReason> {
    let (first, second) = citation_pair(text)?;
    if cross_regulation_only
        && first.regulation.to_lowercase() == second.regulation.to_lowercase()
    {
        return Err(WarningReason::SameRegulation(first.regulation));
    }
    let tail = text.get(second.end..).unwrap_or("");
    Ok(Finding {
        pair: RegulationPair(first.render(), second.render()),
        quotes: extract_quotes(text),
        unquoted: strip_quotes(text),
        description: describe(text, tail),
    })
}

fn excerpts(quotes: &[String]) -> Excerpts {
    Excerpts {
        regulation1: quotes.first().cloned(),
        regulation2: quotes.get(1).cloned(),
    }
}

/// Parse one contradiction finding at 1-based `ordinal`.
pub fn parse_contradiction(
    text: &str,
    ordinal: usize,
    cross_regulation_only: bool,
) -> Result<ContradictionRecord, WarningReason> {
    let f = read_finding(text, cross_regulation_only)?;
    Ok(ContradictionRecord {
        id: record_id(RecordKind::Contradiction, &f.pair, ordinal),
        severity: parse_severity(&f.unquoted),
        conflicting_requirements: excerpts(&f.quotes),
        description: f.description,
        regulation_pair: f.pair,
    })
}

/// Parse one overlap finding at 1-based `ordinal`.
pub fn parse_overlap(
    text: &str,
    ordinal: usize,
    cross_regulation_only: bool,
) -> Result<OverlapRecord, WarningReason> {
    let f = read_finding(text, cross_regulation_only)?;
    Ok(OverlapRecord {
        id: record_id(RecordKind::Overlap, &f.pair, ordinal),
        overlap_type: parse_overlap_type(&f.unquoted),
        confidence_score: parse_confidence(&f.unquoted),
        excerpts: excerpts(&f.quotes),
        description: f.description,
        regulation_pair: f.pair,
    })
}

fn collect<T>(
    body: Option<&str>,
    section: SectionKind,
    warnings: &mut Vec<ParseWarning>,
    parse: impl Fn(&str, usize) -> Result<T, WarningReason>,
) -> Vec<T> {
    let Some(body) = body else {
        return Vec::new();
    };
    let mut records = Vec::new();
    for (i, finding) in section_findings(body).iter().enumerate() {
        let ordinal = i + 1;
        match parse(finding, ordinal) {
            Ok(record) => records.push(record),
            Err(reason) => {
                let warning = ParseWarning {
                    section,
                    ordinal,
                    reason,
                };
                tracing::warn!(%warning, "dropping analysis finding");
                warnings.push(warning);
            }
        }
    }
    records
}

/// Parse a complete analysis response. Never fails.
pub fn parse_analysis(raw: &str, cross_regulation_only: bool) -> ParsedAnalysis {
    let sections = split_sections(raw);
    let mut warnings = Vec::new();

    let contradictions = collect(
        sections.contradictions,
        SectionKind::Contradictions,
        &mut warnings,
        |text, ordinal| parse_contradiction(text, ordinal, cross_regulation_only),
    );
    let overlaps = collect(
        sections.overlaps,
        SectionKind::Overlaps,
        &mut warnings,
        |text, ordinal| parse_overlap(text, ordinal, cross_regulation_only),
    );

    ParsedAnalysis {
        summary: sections
            .summary
            .map(|s| s.replace("**", "").trim().to_string())
            .unwrap_or_default(),
        key_findings: sections.key_findings.map(list_items).unwrap_or_default(),
        contradictions,
        overlaps,
        recommendations: sections.recommendations.map(list_items).unwrap_or_default(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = "\
SUMMARY
CRR and CRD IV diverge on minimum risk weights.

KEY FINDINGS
1. Risk weight floors differ between the two texts.
2. Supervisory discretion applies.

CONTRADICTIONS
1. CRR Article 124 vs CRD IV Article 79 ... Severity: MEDIUM ... 'Risk weight shall not be lower than 35%' ... 'Minimum risk weight of 25%'

OVERLAPS
None identified.

RECOMMENDATIONS
1. Apply the stricter floor.
";

    #[test]
    fn test_canonical_contradiction() {
        let parsed = parse_analysis(CANONICAL, true);
        assert_eq!(parsed.contradictions.len(), 1);
        let c = &parsed.contradictions[0];
        assert_eq!(c.severity, Severity::Medium);
        assert_eq!(
            c.regulation_pair,
            RegulationPair("CRR Article 124".into(), "CRD IV Article 79".into())
        );
        assert_eq!(
            c.conflicting_requirements.regulation1.as_deref(),
            Some("Risk weight shall not be lower than 35%")
        );
        assert_eq!(
            c.conflicting_requirements.regulation2.as_deref(),
            Some("Minimum risk weight of 25%")
        );
        assert!(!c.description.is_empty());
        assert!(parsed.overlaps.is_empty());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_canonical_other_sections() {
        let parsed = parse_analysis(CANONICAL, true);
        assert_eq!(parsed.summary, "CRR and CRD IV diverge on minimum risk weights.");
        assert_eq!(parsed.key_findings.len(), 2);
        assert_eq!(parsed.recommendations, vec!["Apply the stricter floor."]);
    }

    #[test]
    fn test_overlap_with_percentage_confidence() {
        let raw = "OVERLAPS\n1. CRR Article 124 & CRD IV Article 79 — Complementary — Confidence: 89%\n";
        let parsed = parse_analysis(raw, true);
        assert_eq!(parsed.overlaps.len(), 1);
        let o = &parsed.overlaps[0];
        assert_eq!(o.overlap_type, OverlapType::Complementary);
        assert!((o.confidence_score - 0.89).abs() < 1e-9);
        assert_eq!(o.description, "Complementary");
        assert_eq!(o.excerpts, Excerpts::default());
    }

    #[test]
    fn test_ids_are_stable_across_parses() {
        let a = parse_analysis(CANONICAL, true);
        let b = parse_analysis(CANONICAL, true);
        assert_eq!(a.contradictions[0].id, b.contradictions[0].id);
    }

    #[test]
    fn test_markdown_headers() {
        let raw = "\
## **Summary:**
Short.

### 3. **CONTRADICTIONS (if any)**
**1. GDPR Article 6 vs ePrivacy Directive Article 5** — Severity: **HIGH**
   - GDPR: \"Processing shall be lawful only if\"
   - ePrivacy: \"Storing of information is only allowed\"

## OVERLAPS:
1) GDPR Article 32 and NIS2 Directive Article 21 — Type: Duplicate — Confidence: 0.6
";
        let parsed = parse_analysis(raw, true);
        assert_eq!(parsed.summary, "Short.");
        assert_eq!(parsed.contradictions.len(), 1);
        let c = &parsed.contradictions[0];
        assert_eq!(c.severity, Severity::High);
        assert_eq!(c.regulation_pair.0, "GDPR Article 6");
        assert_eq!(c.regulation_pair.1, "ePrivacy Directive Article 5");
        assert_eq!(
            c.conflicting_requirements.regulation2.as_deref(),
            Some("Storing of information is only allowed")
        );

        assert_eq!(parsed.overlaps.len(), 1);
        assert_eq!(parsed.overlaps[0].overlap_type, OverlapType::Duplicate);
        assert!((parsed.overlaps[0].confidence_score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_inline_header_body() {
        let s = split_sections("SUMMARY: all good\nOVERLAPS: None identified\n");
        assert_eq!(s.summary, Some("all good"));
        assert_eq!(s.overlaps, Some("None identified"));
        assert_eq!(s.contradictions, None);
    }

    #[test]
    fn test_indented_label_line_continues_finding() {
        let raw = "\
CONTRADICTIONS
1. CRR Article 124 vs CRD IV Article 79 - risk weight floors
   Summary: the CRR floor is stricter
2. GDPR Article 6 vs ePrivacy Directive Article 5 - consent
";
        let parsed = parse_analysis(raw, true);
        assert_eq!(parsed.contradictions.len(), 2);
        assert!(parsed.contradictions[0].description.contains("stricter"));
        assert_eq!(parsed.contradictions[1].regulation_pair.0, "GDPR Article 6");
        assert!(parsed.summary.is_empty());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_indented_markdown_header_still_counts() {
        let s = split_sections("  ## OVERLAPS\nNone identified\n");
        assert_eq!(s.overlaps, Some("None identified"));
    }

    #[test]
    fn test_first_section_span_wins() {
        let s = split_sections("SUMMARY\nfirst\nSUMMARY\nsecond\n");
        assert_eq!(s.summary, Some("first"));
    }

    #[test]
    fn test_preamble_and_prose_lines_are_not_headers() {
        let s = split_sections("Here is my analysis.\nSummary of the issue follows\n");
        assert_eq!(s, Sections::default());
    }

    #[test]
    fn test_none_identified_yields_no_warnings() {
        let raw = "CONTRADICTIONS\nNone identified.\n\nOVERLAPS\nNo significant overlaps were found.\n";
        let parsed = parse_analysis(raw, true);
        assert!(parsed.contradictions.is_empty());
        assert!(parsed.overlaps.is_empty());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_malformed_input_never_fails() {
        for raw in ["", "\n\n", "###", "CONTRADICTIONS", "1. 2. 3.", "OVERLAPS\n1.\n2) \u{0}"] {
            let parsed = parse_analysis(raw, true);
            assert!(parsed.contradictions.is_empty());
            assert!(parsed.overlaps.is_empty());
        }
    }

    #[test]
    fn test_single_citation_is_dropped_with_warning() {
        let raw = "\
CONTRADICTIONS
1. CRR Article 124 conflicts with national practice. Severity: LOW
2. CRR Article 92 vs BRRD Article 45 — Severity: CRITICAL
";
        let parsed = parse_analysis(raw, true);
        assert_eq!(parsed.contradictions.len(), 1);
        assert_eq!(parsed.contradictions[0].severity, Severity::Critical);
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning {
                section: SectionKind::Contradictions,
                ordinal: 1,
                reason: WarningReason::TooFewCitations(1),
            }]
        );
    }

    #[test]
    fn test_ordinal_counts_dropped_findings() {
        let raw = "OVERLAPS\n1. nothing cited\n2. CRR Article 1 and MiFID II Article 2\n";
        let parsed = parse_analysis(raw, true);
        let pair = RegulationPair("CRR Article 1".into(), "MiFID II Article 2".into());
        assert_eq!(parsed.overlaps[0].id, record_id(RecordKind::Overlap, &pair, 2));
    }

    #[test]
    fn test_same_regulation_dropped_only_when_cross_focused() {
        let raw = "CONTRADICTIONS\n1. CRR Article 124 vs CRR Article 92 — Severity: HIGH\n";
        let focused = parse_analysis(raw, true);
        assert!(focused.contradictions.is_empty());
        assert_eq!(
            focused.warnings[0].reason,
            WarningReason::SameRegulation("CRR".into())
        );

        let all = parse_analysis(raw, false);
        assert_eq!(all.contradictions.len(), 1);
    }

    #[test]
    fn test_duplicate_citation_is_not_a_pair() {
        let c = citation_pair("CRR Article 124 restates CRR article 124");
        assert_eq!(c.unwrap_err(), WarningReason::TooFewCitations(1));
    }

    #[test]
    fn test_citation_shapes() {
        let cites: Vec<String> = extract_citations(
            "Under CRR Article 124(1), unlike Article 79 of CRD IV and Regulation (EU) No 575/2013 Art. 92a",
        )
        .iter()
        .map(Citation::render)
        .collect();
        assert_eq!(
            cites,
            vec![
                "CRR Article 124(1)",
                "CRD IV Article 79",
                "Regulation (EU) No 575/2013 Article 92a",
            ]
        );
    }

    #[test]
    fn test_uppercase_separator_is_not_part_of_name() {
        let raw = "CONTRADICTIONS\n1. CRR Article 124 VS CRD IV Article 79 - floors differ\n";
        let parsed = parse_analysis(raw, true);
        let c = &parsed.contradictions[0];
        assert_eq!(
            c.regulation_pair,
            RegulationPair("CRR Article 124".into(), "CRD IV Article 79".into())
        );
        assert_eq!(c.description, "floors differ");
    }

    #[test]
    fn test_bare_article_is_not_a_citation() {
        assert!(extract_citations("see article 5 for details").is_empty());
    }

    #[test]
    fn test_severity_label_beats_earlier_keyword() {
        assert_eq!(
            parse_severity("high capital needs ... Severity: LOW"),
            Severity::Low
        );
        assert_eq!(parse_severity("no keyword"), Severity::Medium);
    }

    #[test]
    fn test_overlap_type_default() {
        assert_eq!(parse_overlap_type("same scope"), OverlapType::Complementary);
        assert_eq!(
            parse_overlap_type("the provisions are conflicting"),
            OverlapType::Conflicting
        );
    }

    #[test]
    fn test_confidence_forms() {
        assert!((parse_confidence("Confidence: 0.92") - 0.92).abs() < 1e-9);
        assert!((parse_confidence("confidence score 85") - 0.85).abs() < 1e-9);
        assert!((parse_confidence("about 70% likely") - 0.70).abs() < 1e-9);
        assert!((parse_confidence("roughly 0.4") - 0.4).abs() < 1e-9);
        assert_eq!(parse_confidence("Confidence: 250%"), 1.0);
        assert_eq!(parse_confidence("nothing here"), DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_quoted_percentages_do_not_set_confidence() {
        let raw = "OVERLAPS\n1. CRR Article 124 and CRD IV Article 79: \"floor of 35% applies\"\n";
        let parsed = parse_analysis(raw, true);
        assert_eq!(parsed.overlaps[0].confidence_score, DEFAULT_CONFIDENCE);
        assert_eq!(
            parsed.overlaps[0].excerpts.regulation1.as_deref(),
            Some("floor of 35% applies")
        );
    }

    #[test]
    fn test_curly_quotes_and_apostrophes() {
        let q = extract_quotes("the institution's “own funds” and ‘capital buffer’ rules");
        assert_eq!(q, vec!["own funds", "capital buffer"]);
    }

    #[test]
    fn test_unnumbered_body_is_one_finding() {
        let raw = "OVERLAPS\nGDPR Article 5 and DORA Article 9 both require integrity controls.\n";
        let parsed = parse_analysis(raw, true);
        assert_eq!(parsed.overlaps.len(), 1);
        assert_eq!(
            parsed.overlaps[0].description,
            "both require integrity controls."
        );
    }
}
