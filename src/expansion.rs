//! Query expansion against the configured language model.
//!
//! Expansion is best effort: with no generator, an error, an unusable
//! answer, or a timeout, the expander returns just the original query.

use std::sync::Arc;
use std::time::Duration;

use lexfuse_core::expansion::{expansion_prompt, merge_variants, parse_variants};
use lexfuse_core::llm::TextGenerator;

pub struct QueryExpander {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl QueryExpander {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Up to `variants` query strings; the first is always `query`.
    pub async fn expand(&self, query: &str, variants: usize) -> Vec<String> {
        let original = vec![query.to_string()];
        if variants <= 1 {
            return original;
        }
        let Some(generator) = &self.generator else {
            tracing::debug!("no language model configured; skipping expansion");
            return original;
        };

        let prompt = expansion_prompt(query, variants - 1);
        let content = match tokio::time::timeout(self.timeout, generator.complete(&prompt)).await {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "query expansion failed; using original query only");
                return original;
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "query expansion timed out; using original query only");
                return original;
            }
        };

        let merged = merge_variants(query, parse_variants(&content), variants);
        tracing::debug!(variants = merged.len(), "expanded query");
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct Canned {
        answer: Result<String, String>,
        delay: Duration,
    }

    #[async_trait]
    impl TextGenerator for Canned {
        fn model_name(&self) -> &str {
            "canned"
        }
        async fn complete(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            self.answer.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn expander(answer: Result<&str, &str>, delay_ms: u64) -> QueryExpander {
        let generator = Canned {
            answer: answer.map(String::from).map_err(String::from),
            delay: Duration::from_millis(delay_ms),
        };
        QueryExpander::new(Some(Arc::new(generator)), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_expands_with_original_first() {
        let e = expander(Ok(r#"["GDPR obligations", "personal data duties", "extra"]"#), 0);
        let v = e.expand("data protection", 3).await;
        assert_eq!(v, vec!["data protection", "GDPR obligations", "personal data duties"]);
    }

    #[tokio::test]
    async fn test_single_variant_skips_model() {
        let e = expander(Err("must not be called"), 0);
        assert_eq!(e.expand("q", 1).await, vec!["q"]);
    }

    #[tokio::test]
    async fn test_error_degrades_to_original() {
        let e = expander(Err("quota exceeded"), 0);
        assert_eq!(e.expand("q", 3).await, vec!["q"]);
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_original() {
        let e = expander(Ok(r#"["a", "b"]"#), 500);
        assert_eq!(e.expand("q", 3).await, vec!["q"]);
    }

    #[tokio::test]
    async fn test_no_generator() {
        let e = QueryExpander::new(None, Duration::from_secs(1));
        assert_eq!(e.expand("q", 3).await, vec!["q"]);
    }
}
