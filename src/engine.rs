//! The retrieval, fusion and analysis engine.
//!
//! # Pipeline
//!
//! ```text
//! Query ──normalize──▶ fingerprint ──▶ single-flight ──▶ cache hit? ──▶ payload
//!                                            │ miss
//!                                            ▼
//!            expand ──▶ embed + search × variants (concurrent, timed)
//!                                            │
//!                                 fuse (RRF) ──▶ hydrate
//!                                            │
//!                         [analyze] prompt ──▶ LLM ──▶ parse
//!                                            │
//!                                 serialize ──▶ cache put ──▶ payload
//! ```
//!
//! Collaborators are supplied as an [`EngineDeps`] set so each one can be
//! replaced independently. The payload returned for a fingerprint is the
//! exact JSON stored in the cache; a hit returns it byte-for-byte.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use lexfuse_core::embedding::{embed_one, EmbeddingProvider};
use lexfuse_core::fingerprint::fingerprint;
use lexfuse_core::fusion::fuse;
use lexfuse_core::hydrate::hydrate;
use lexfuse_core::index::VectorIndex;
use lexfuse_core::llm::TextGenerator;
use lexfuse_core::metadata::MetadataStore;
use lexfuse_core::models::{AnalysisResult, Query, RankedHit, RetrievalResult, DEFAULT_RRF_K};
use lexfuse_core::store::{CacheStats, CacheStore};

use crate::analysis::AnalysisInvoker;
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::expansion::QueryExpander;
use crate::singleflight::{Coalescer, Role};

/// External collaborators.
#[derive(Clone)]
pub struct EngineDeps {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndex>,
    pub metadata: Arc<dyn MetadataStore>,
    pub cache: Arc<dyn CacheStore>,
    /// Used for expansion and analysis; both degrade without it.
    pub llm: Option<Arc<dyn TextGenerator>>,
}

/// Tunables, usually built from [`Config`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub rrf_k: u32,
    /// Query variants including the original.
    pub variants: usize,
    /// Per-variant search depth when expanding.
    pub expansion_depth: usize,
    pub embed_timeout: Duration,
    pub search_timeout: Duration,
    pub expansion_timeout: Duration,
    pub llm_timeout: Duration,
    pub max_chunks: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            variants: 3,
            expansion_depth: 30,
            embed_timeout: Duration::from_secs(10),
            search_timeout: Duration::from_secs(10),
            expansion_timeout: Duration::from_secs(15),
            llm_timeout: Duration::from_secs(60),
            max_chunks: 10,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        let r = &config.retrieval;
        Self {
            rrf_k: r.rrf_k,
            variants: r.variants,
            expansion_depth: r.expansion_depth,
            embed_timeout: Duration::from_secs(r.embed_timeout_secs),
            search_timeout: Duration::from_secs(r.search_timeout_secs),
            expansion_timeout: Duration::from_secs(r.expansion_timeout_secs),
            llm_timeout: config.llm.timeout(),
            max_chunks: config.analysis.max_chunks,
        }
    }
}

/// Cheap to clone; clones share collaborators and in-flight computes.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    deps: EngineDeps,
    settings: EngineSettings,
    expander: QueryExpander,
    invoker: AnalysisInvoker,
    flights: Coalescer<String>,
}

/// Why one variant produced no list.
enum VariantError {
    TimedOut(&'static str),
    Failed(EngineError),
}

impl Engine {
    pub fn new(deps: EngineDeps, settings: EngineSettings) -> Self {
        let expander = QueryExpander::new(deps.llm.clone(), settings.expansion_timeout);
        let invoker = AnalysisInvoker::new(deps.llm.clone(), settings.llm_timeout, settings.max_chunks);
        Self {
            inner: Arc::new(Inner {
                deps,
                settings,
                expander,
                invoker,
                flights: Coalescer::new(),
            }),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.inner.settings
    }

    /// Retrieve and fuse chunks for `query`. `analyze` is ignored.
    pub async fn retrieve(&self, query: &Query) -> EngineResult<RetrievalResult> {
        let payload = self.retrieve_payload(query).await?;
        serde_json::from_str(&payload).map_err(EngineError::cache)
    }

    /// Like [`retrieve`](Self::retrieve), returning the cached JSON payload.
    pub async fn retrieve_payload(&self, query: &Query) -> EngineResult<String> {
        self.payload(query.clone().with_analyze(false)).await
    }

    /// Retrieve, then run the overlap/contradiction analysis over the
    /// chunks. Model failures degrade to `analysis_available = false`.
    pub async fn analyze(&self, query: &Query) -> EngineResult<AnalysisResult> {
        let payload = self.analyze_payload(query).await?;
        serde_json::from_str(&payload).map_err(EngineError::cache)
    }

    pub async fn analyze_payload(&self, query: &Query) -> EngineResult<String> {
        self.payload(query.clone().with_analyze(true)).await
    }

    pub async fn cache_stats(&self) -> EngineResult<CacheStats> {
        self.inner.deps.cache.stats().await.map_err(EngineError::cache)
    }

    /// Drop every cache entry, or those whose fingerprint starts with
    /// `prefix` (e.g. `"analyze:"`).
    pub async fn invalidate(&self, prefix: Option<&str>) -> EngineResult<u64> {
        let removed = self
            .inner
            .deps
            .cache
            .invalidate(prefix)
            .await
            .map_err(EngineError::cache)?;
        tracing::info!(removed, prefix = prefix.unwrap_or("*"), "cache invalidated");
        Ok(removed)
    }

    async fn payload(&self, query: Query) -> EngineResult<String> {
        let query = query.normalized()?;
        let key = fingerprint(&query);
        let inner = Arc::clone(&self.inner);
        let fp = key.clone();

        let (out, role) = self
            .inner
            .flights
            .run(&key, move || async move { inner.read_through(&fp, query).await })
            .await;
        if role == Role::Joined {
            tracing::debug!(fingerprint = %key, "joined in-flight compute");
        }
        out
    }
}

impl Inner {
    /// Cache hit or compute + write-through. Runs inside a single flight.
    async fn read_through(&self, fp: &str, query: Query) -> EngineResult<String> {
        if let Some(entry) = self.deps.cache.record_hit(fp).await.map_err(EngineError::cache)? {
            tracing::debug!(fingerprint = fp, hits = entry.hit_count, "cache hit");
            return Ok(entry.payload);
        }

        let (payload, cacheable) = if query.analyze {
            let result = self.compute_analysis(&query).await?;
            (to_payload(&result)?, result.analysis_available)
        } else {
            let result = self.compute_retrieval(&query).await?;
            (to_payload(&result)?, true)
        };

        if !cacheable {
            tracing::debug!(fingerprint = fp, "degraded analysis not cached");
        } else if let Err(e) = self.deps.cache.put(fp, &payload).await {
            tracing::warn!(fingerprint = fp, error = %e, "cache write failed");
        }
        Ok(payload)
    }

    async fn compute_analysis(&self, query: &Query) -> EngineResult<AnalysisResult> {
        let retrieval = self.compute_retrieval(query).await?;
        Ok(self
            .invoker
            .analyze(&query.text, retrieval, query.cross_regulation_only)
            .await)
    }

    async fn compute_retrieval(&self, query: &Query) -> EngineResult<RetrievalResult> {
        let started = std::time::Instant::now();
        let (variants, depth) = if query.expand {
            (
                self.expander.expand(&query.text, self.settings.variants).await,
                query.top_k.max(self.settings.expansion_depth),
            )
        } else {
            (vec![query.text.clone()], query.top_k)
        };

        let searches = variants
            .iter()
            .map(|text| self.search_variant(text, depth, query));
        let outcomes = join_all(searches).await;

        let mut lists = Vec::with_capacity(outcomes.len());
        for (i, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(hits) => lists.push(hits),
                Err(VariantError::TimedOut(stage)) if i > 0 => {
                    tracing::warn!(variant = i, stage, "variant timed out; contributing no results");
                    lists.push(Vec::new());
                }
                Err(VariantError::TimedOut(stage)) => {
                    return Err(EngineError::Retrieval(format!("primary query {} timed out", stage)));
                }
                Err(VariantError::Failed(e)) => return Err(e),
            }
        }

        let fused = fuse(&lists, self.settings.rrf_k, query.top_k);
        let ids: Vec<String> = fused.iter().map(|h| h.chunk_id.clone()).collect();
        let records = if ids.is_empty() {
            Default::default()
        } else {
            self.deps
                .metadata
                .lookup(&ids)
                .await
                .map_err(|e| EngineError::Retrieval(format!("metadata lookup failed: {}", e)))?
        };
        let hydrated = hydrate(&fused, records, &query.filters);
        let dropped_ids = hydrated.dropped();

        tracing::info!(
            variants = variants.len(),
            fused = fused.len(),
            chunks = hydrated.chunks.len(),
            dropped = dropped_ids,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrieval complete"
        );

        Ok(RetrievalResult {
            query: query.text.clone(),
            chunks: hydrated.chunks,
            variants: variants.len(),
            dropped_ids,
        })
    }

    /// Embed one phrasing and search it, each step under its own timeout.
    async fn search_variant(
        &self,
        text: &str,
        depth: usize,
        query: &Query,
    ) -> Result<Vec<RankedHit>, VariantError> {
        let embedding = tokio::time::timeout(
            self.settings.embed_timeout,
            embed_one(self.deps.embedder.as_ref(), text),
        )
        .await
        .map_err(|_| VariantError::TimedOut("embedding"))?
        .map_err(|e| VariantError::Failed(EngineError::Retrieval(format!("embedding failed: {}", e))))?;

        tokio::time::timeout(
            self.settings.search_timeout,
            self.deps.index.search(&embedding, depth, &query.filters),
        )
        .await
        .map_err(|_| VariantError::TimedOut("vector search"))?
        .map_err(|e| VariantError::Failed(EngineError::Retrieval(format!("vector search failed: {}", e))))
    }
}

fn to_payload<T: serde::Serialize>(value: &T) -> EngineResult<String> {
    serde_json::to_string(value).map_err(EngineError::cache)
}
