//! Build an [`Engine`] from configuration.

use anyhow::{Context, Result};
use std::sync::Arc;

use lexfuse_core::store::CacheStore;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::engine::{Engine, EngineDeps, EngineSettings};
use crate::index_client::HttpVectorIndex;
use crate::llm::create_generator;
use crate::metadata_loader::load_jsonl;
use crate::sqlite_cache::SqliteCacheStore;

/// Open only the cache; enough for `cache stats` and `cache clear`.
pub async fn open_cache(config: &Config) -> Result<Arc<dyn CacheStore>> {
    let store = SqliteCacheStore::open(&config.cache.path)
        .await
        .with_context(|| format!("Failed to open cache at {}", config.cache.path.display()))?;
    Ok(Arc::new(store))
}

/// Wire every collaborator named in `config`.
pub async fn build_engine(config: &Config) -> Result<Engine> {
    if !config.embedding.is_enabled() {
        anyhow::bail!("embedding.provider must be configured to run queries");
    }
    if config.metadata.paths.is_empty() {
        tracing::warn!("metadata.paths is empty; every retrieved chunk will be dropped");
    }

    let embedder = create_provider(&config.embedding)?;
    let index = Arc::new(HttpVectorIndex::new(&config.index)?);
    let (metadata, _report) = load_jsonl(&config.metadata.paths)?;
    let cache = open_cache(config).await?;
    let llm = create_generator(&config.llm)?;

    let deps = EngineDeps {
        embedder,
        index,
        metadata: Arc::new(metadata),
        cache,
        llm,
    };
    Ok(Engine::new(deps, EngineSettings::from_config(config)))
}
