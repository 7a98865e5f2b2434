//! Analysis invocation: one prompt, one bounded model call, lenient parse.
//!
//! A missing generator, a model error or a timeout never fails the
//! request. The retrieval is returned with `analysis_available = false`.

use std::sync::Arc;
use std::time::Duration;

use lexfuse_core::analysis::{analysis_prompt, parse_analysis};
use lexfuse_core::llm::TextGenerator;
use lexfuse_core::models::{AnalysisResult, RetrievalResult};

pub struct AnalysisInvoker {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
    max_chunks: usize,
}

impl AnalysisInvoker {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        timeout: Duration,
        max_chunks: usize,
    ) -> Self {
        Self {
            generator,
            timeout,
            max_chunks,
        }
    }

    pub async fn analyze(
        &self,
        query: &str,
        retrieval: RetrievalResult,
        cross_regulation_only: bool,
    ) -> AnalysisResult {
        let Some(generator) = &self.generator else {
            tracing::warn!("no language model configured; analysis unavailable");
            return AnalysisResult::unavailable(retrieval);
        };
        if retrieval.chunks.is_empty() {
            tracing::info!("no chunks retrieved; skipping analysis");
            return AnalysisResult::unavailable(retrieval);
        }

        let prompt = analysis_prompt(query, &retrieval.chunks, self.max_chunks, cross_regulation_only);
        let started = std::time::Instant::now();
        let raw = match tokio::time::timeout(self.timeout, generator.complete(&prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(model = generator.model_name(), error = %e, "analysis failed; returning retrieval only");
                return AnalysisResult::unavailable(retrieval);
            }
            Err(_) => {
                tracing::warn!(model = generator.model_name(), timeout = ?self.timeout, "analysis timed out; returning retrieval only");
                return AnalysisResult::unavailable(retrieval);
            }
        };

        let parsed = parse_analysis(&raw, cross_regulation_only);
        for warning in &parsed.warnings {
            tracing::warn!(%warning, "dropped analysis finding");
        }
        tracing::info!(
            model = generator.model_name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            overlaps = parsed.overlaps.len(),
            contradictions = parsed.contradictions.len(),
            dropped = parsed.warnings.len(),
            "analysis complete"
        );

        AnalysisResult {
            retrieval,
            analysis_available: true,
            summary: parsed.summary,
            key_findings: parsed.key_findings,
            overlaps: parsed.overlaps,
            contradictions: parsed.contradictions,
            recommendations: parsed.recommendations,
            raw_analysis: Some(raw),
            parse_warnings: parsed.warnings.len(),
        }
    }
}
