//! # lexfuse
//!
//! Retrieval, rank fusion and analysis engine for regulatory text.
//!
//! lexfuse embeds a query (and optionally model-generated rephrasings of
//! it), searches a pre-built vector index once per phrasing, fuses the
//! rankings with reciprocal rank fusion, and resolves the fused ids to
//! chunk text and regulatory metadata. On request it asks a language model
//! where the retrieved regulations overlap or contradict each other and
//! parses the answer into typed records. Every response is cached by query
//! fingerprint, with single-flight coalescing of concurrent requests.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────┐   ┌───────────┐
//! │  Query   │──▶│ expand · embed ·  │──▶│  RRF fuse │
//! │          │   │ search × variants │   │  hydrate  │
//! └──────────┘   └───────────────────┘   └─────┬─────┘
//!                                              │
//!                     ┌────────────────────────┤
//!                     ▼                        ▼
//!              ┌─────────────┐          ┌─────────────┐
//!              │ LLM analyze │          │ SQLite cache│
//!              │   + parse   │          │ single-flight│
//!              └─────────────┘          └─────────────┘
//! ```
//!
//! Pure logic and collaborator traits live in `lexfuse-core`; this crate
//! wires them to SQLite, HTTP services and tokio.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`engine`] | The engine: fan-out, fusion, caching, analysis |
//! | [`error`] | Engine error taxonomy |
//! | [`singleflight`] | Per-fingerprint request coalescing |
//! | [`expansion`] | Timed query expansion |
//! | [`analysis`] | Timed analysis invocation with degradation |
//! | [`embedding`] | OpenAI / Ollama embedding providers |
//! | [`index_client`] | HTTP nearest-neighbor client |
//! | [`llm`] | OpenAI / Ollama chat clients |
//! | [`metadata_loader`] | JSONL metadata loading |
//! | [`sqlite_cache`] | SQLite `CacheStore` |
//! | [`db`] | Database connection |
//! | [`migrate`] | Cache schema |
//! | [`bootstrap`] | Build an engine from config |

pub mod analysis;
pub mod analyze_cmd;
pub mod bootstrap;
pub mod cache_cmd;
pub mod config;
pub mod db;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod expansion;
mod http;
pub mod index_client;
pub mod llm;
pub mod metadata_loader;
pub mod migrate;
pub mod parse_cmd;
pub mod retrieve;
pub mod singleflight;
pub mod sqlite_cache;

pub use lexfuse_core::{fusion, hydrate, models, store};
pub use engine::{Engine, EngineDeps, EngineSettings};
pub use error::{EngineError, EngineResult};
