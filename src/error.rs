//! Engine error taxonomy.
//!
//! Only three failures reach a caller. Missing metadata, a degraded
//! analysis and dropped findings are not errors: they are logged and
//! counted on the result (`dropped_ids`, `analysis_available`,
//! `parse_warnings`).

use lexfuse_core::models::InvalidQuery;

/// Fatal engine failures.
///
/// `Clone` so one in-flight compute can hand the same error to every
/// coalesced caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// Malformed query or filters; rejected before any upstream call.
    #[error("invalid query: {0}")]
    Validation(#[from] InvalidQuery),

    /// Embedding or vector search failed or timed out.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The cache store failed or returned an unreadable payload.
    #[error("cache error: {0}")]
    Cache(String),
}

impl EngineError {
    pub fn retrieval(err: impl std::fmt::Display) -> Self {
        EngineError::Retrieval(err.to_string())
    }

    pub fn cache(err: impl std::fmt::Display) -> Self {
        EngineError::Cache(err.to_string())
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        EngineError::Retrieval(format!("compute task aborted: {}", err))
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
