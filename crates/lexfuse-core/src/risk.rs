//! Risk categories.
//!
//! Each named category carries a keyword list. A chunk matches a category
//! when its text or regulation name contains any keyword, case-insensitively.
//! Unknown category names match everything; the vector index still applies
//! the category as a namespace restrict.

/// `(category, keywords)` pairs.
pub const RISK_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "data_privacy",
        &["GDPR", "personal data", "data protection", "privacy", "ePrivacy", "confidentiality"],
    ),
    (
        "financial_regulation",
        &["MiFID", "capital requirements", "banking", "financial stability", "prudential", "Basel"],
    ),
    (
        "consumer_protection",
        &["consumer rights", "unfair terms", "consumer credit", "consumer contracts"],
    ),
    (
        "environmental",
        &["emissions", "waste management", "environmental protection", "climate", "sustainability"],
    ),
    (
        "health_safety",
        &["food safety", "medical devices", "pharmaceuticals", "health", "safety standards"],
    ),
    (
        "market_conduct",
        &["competition", "market abuse", "antitrust", "cartels", "monopoly"],
    ),
    (
        "employment",
        &["working time", "employee rights", "labor conditions", "employment contracts"],
    ),
    (
        "telecommunications",
        &["telecom", "electronic communications", "spectrum", "network"],
    ),
    (
        "transport",
        &["aviation", "maritime", "road transport", "railway", "shipping"],
    ),
    (
        "energy",
        &["energy efficiency", "renewable energy", "electricity", "gas", "energy market"],
    ),
    (
        "trade",
        &["customs", "tariffs", "trade agreements", "import", "export"],
    ),
    (
        "taxation",
        &["tax", "VAT", "excise", "tax evasion", "tax avoidance"],
    ),
    (
        "insurance",
        &["insurance", "reinsurance", "Solvency", "insurance undertaking"],
    ),
    (
        "payments",
        &["payment services", "electronic money", "payment systems", "PSD2"],
    ),
    (
        "aml_cft",
        &["money laundering", "terrorist financing", "AML", "CTF", "suspicious transactions"],
    ),
];

/// Keywords for a category, or `None` if the name is not a known category.
pub fn keywords(category: &str) -> Option<&'static [&'static str]> {
    RISK_CATEGORIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, kws)| *kws)
}

/// Whether a chunk belongs to `category`.
pub fn matches(category: &str, full_text: &str, regulation_name: &str) -> bool {
    let Some(kws) = keywords(category) else {
        return true;
    };
    let text = full_text.to_lowercase();
    let name = regulation_name.to_lowercase();
    kws.iter().any(|kw| {
        let kw = kw.to_lowercase();
        text.contains(&kw) || name.contains(&kw)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifteen_categories() {
        assert_eq!(RISK_CATEGORIES.len(), 15);
        assert!(keywords("AML_CFT").is_some());
        assert!(keywords("astrology").is_none());
    }

    #[test]
    fn test_matches_text_or_name() {
        assert!(matches("data_privacy", "Processing of Personal Data shall...", ""));
        assert!(matches("payments", "", "PSD2"));
        assert!(!matches("payments", "Emission allowances", "ETS Directive"));
    }

    #[test]
    fn test_unknown_category_passes() {
        assert!(matches("unknown", "anything", "anything"));
    }
}
