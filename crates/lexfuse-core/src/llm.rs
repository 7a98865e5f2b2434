//! Text-generation collaborator.
//!
//! The language model is a black box: it takes a prompt and returns raw
//! text. Both query expansion and regulatory analysis go through this trait.
//! Timeouts are applied by the caller, not by implementations.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier used in logs.
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}
