//! Request fingerprints for the response cache.
//!
//! A fingerprint is a SHA-256 digest over every input that changes the
//! response: normalized query text, normalized filters, `top_k`, and the
//! `expand` / `analyze` / `cross_regulation_only` flags. It is rendered as
//! `"<kind>:<hex>"` so invalidation can target one kind by prefix.
//!
//! Callers must pass an already-normalized [`Query`] (see
//! [`Query::normalized`]); two requests that normalize to the same query
//! always collide, and two that differ in any field never do.

use sha2::{Digest, Sha256};

use crate::models::Query;

/// Which response a fingerprint identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Retrieve,
    Analyze,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Retrieve => "retrieve",
            Kind::Analyze => "analyze",
        }
    }

    /// Fingerprint prefix including the separator, e.g. `"analyze:"`.
    pub fn prefix(&self) -> String {
        format!("{}:", self.as_str())
    }
}

/// Compute the fingerprint of a normalized query.
pub fn fingerprint(query: &Query) -> String {
    let kind = if query.analyze {
        Kind::Analyze
    } else {
        Kind::Retrieve
    };
    let f = &query.filters;

    let fields = [
        query.text.clone(),
        opt(f.year),
        opt(f.min_year),
        f.doc_type.clone().unwrap_or_default(),
        f.category.clone().unwrap_or_default(),
        query.top_k.to_string(),
        flag(query.expand),
        flag(query.analyze),
        flag(query.cross_regulation_only && query.analyze),
    ];

    // Length-delimited so adjacent values cannot run together.
    let mut hasher = Sha256::new();
    for field in &fields {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }

    format!("{}{:x}", kind.prefix(), hasher.finalize())
}

fn opt(v: Option<i32>) -> String {
    v.map(|y| y.to_string()).unwrap_or_default()
}

fn flag(b: bool) -> String {
    let s = if b { "1" } else { "0" };
    s.to_string()
}
