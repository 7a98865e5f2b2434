//! Configuration parsing and validation.
//!
//! lexfuse is configured with a TOML file (default `config/lexfuse.toml`).
//! Only `[cache]` is required; every other section falls back to defaults.
//!
//! ```toml
//! [cache]
//! path = "./data/lexfuse.sqlite"
//!
//! [retrieval]
//! top_k = 10
//! rrf_k = 60
//! variants = 3
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [index]
//! url = "http://localhost:8700/search"
//!
//! [llm]
//! provider = "openai"
//! model = "gpt-4o-mini"
//!
//! [metadata]
//! paths = ["./data/processed_chunks.jsonl"]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// SQLite file holding the response cache.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,
    /// Query variants including the original.
    #[serde(default = "default_variants")]
    pub variants: usize,
    #[serde(default)]
    pub expand: bool,
    /// Per-variant search depth when expansion is on.
    #[serde(default = "default_expansion_depth")]
    pub expansion_depth: usize,
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
    #[serde(default = "default_embed_timeout")]
    pub embed_timeout_secs: u64,
    #[serde(default = "default_expansion_timeout")]
    pub expansion_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            rrf_k: default_rrf_k(),
            variants: default_variants(),
            expand: false,
            expansion_depth: default_expansion_depth(),
            search_timeout_secs: default_search_timeout(),
            embed_timeout_secs: default_embed_timeout(),
            expansion_timeout_secs: default_expansion_timeout(),
        }
    }
}

fn default_top_k() -> usize {
    10
}
fn default_rrf_k() -> u32 {
    lexfuse_core::models::DEFAULT_RRF_K
}
fn default_variants() -> usize {
    3
}
fn default_expansion_depth() -> usize {
    30
}
fn default_search_timeout() -> u64 {
    10
}
fn default_embed_timeout() -> u64 {
    10
}
fn default_expansion_timeout() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL; defaults per provider.
    #[serde(default)]
    pub url: Option<String>,
    /// Retries on 429/5xx inside the HTTP client. The engine itself never
    /// retries.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    0
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IndexConfig {
    /// HTTP nearest-neighbor endpoint.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            timeout_secs: default_llm_timeout(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_llm_timeout() -> u64 {
    60
}
fn default_temperature() -> f32 {
    0.1
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetadataConfig {
    /// JSONL files of processed chunks.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Chunks included in the analysis prompt.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    /// Retrieval depth for analysis requests.
    #[serde(default = "default_analysis_top_k")]
    pub top_k: usize,
    #[serde(default = "default_true")]
    pub cross_regulation_only: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_chunks: default_max_chunks(),
            top_k: default_analysis_top_k(),
            cross_regulation_only: true,
        }
    }
}

fn default_max_chunks() -> usize {
    10
}
fn default_analysis_top_k() -> usize {
    30
}
fn default_true() -> bool {
    true
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Parse and validate a TOML config string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate retrieval
    let r = &config.retrieval;
    if r.top_k < 1 || r.top_k > lexfuse_core::models::MAX_TOP_K {
        anyhow::bail!(
            "retrieval.top_k must be in [1, {}]",
            lexfuse_core::models::MAX_TOP_K
        );
    }
    if r.rrf_k == 0 {
        anyhow::bail!("retrieval.rrf_k must be > 0");
    }
    if r.variants < 1 {
        anyhow::bail!("retrieval.variants must be >= 1");
    }
    if r.expansion_depth < 1 {
        anyhow::bail!("retrieval.expansion_depth must be >= 1");
    }
    if r.search_timeout_secs == 0 || r.embed_timeout_secs == 0 || r.expansion_timeout_secs == 0 {
        anyhow::bail!("retrieval timeouts must be > 0");
    }

    // Validate embedding
    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    // Validate llm
    match config.llm.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if config.llm.is_enabled() && config.llm.model.is_none() {
        anyhow::bail!(
            "llm.model must be specified when provider is '{}'",
            config.llm.provider
        );
    }
    if config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }

    // Validate analysis
    if config.analysis.max_chunks < 1 {
        anyhow::bail!("analysis.max_chunks must be >= 1");
    }
    if config.analysis.top_k < 1 || config.analysis.top_k > lexfuse_core::models::MAX_TOP_K {
        anyhow::bail!(
            "analysis.top_k must be in [1, {}]",
            lexfuse_core::models::MAX_TOP_K
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config("[cache]\npath = \"/tmp/c.sqlite\"\n").unwrap();
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.retrieval.rrf_k, 60);
        assert_eq!(config.retrieval.variants, 3);
        assert_eq!(config.retrieval.expansion_depth, 30);
        assert!(!config.embedding.is_enabled());
        assert!(!config.llm.is_enabled());
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.analysis.max_chunks, 10);
        assert!(config.analysis.cross_regulation_only);
    }

    #[test]
    fn test_rejects_zero_rrf_k() {
        let err = parse_config("[cache]\npath = \"c\"\n[retrieval]\nrrf_k = 0\n").unwrap_err();
        assert!(err.to_string().contains("rrf_k"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse_config("[cache]\npath = \"c\"\n[llm]\nprovider = \"bard\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown llm provider"));
    }

    #[test]
    fn test_embedding_requires_dims() {
        let toml = "[cache]\npath = \"c\"\n[embedding]\nprovider = \"openai\"\nmodel = \"m\"\n";
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
    }

    #[test]
    fn test_missing_cache_section_fails() {
        assert!(parse_config("[retrieval]\ntop_k = 5\n").is_err());
    }
}
