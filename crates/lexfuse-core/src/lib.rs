//! # lexfuse-core
//!
//! Runtime-free core of the lexfuse retrieval, fusion and analysis engine.
//!
//! This crate holds the pure logic and the collaborator traits. It has no
//! async runtime and no I/O of its own; the `lexfuse` crate wires these
//! pieces to SQLite, HTTP services and tokio.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Query, chunk, retrieval and analysis record types |
//! | [`fusion`] | Reciprocal rank fusion over per-variant ranked lists |
//! | [`expansion`] | Expansion prompt, variant parsing and merging |
//! | [`hydrate`] | Fused ids → chunks, with post-search filters |
//! | [`risk`] | Risk category keyword lists |
//! | [`fingerprint`] | Cache keys for normalized queries |
//! | [`analysis`] | Analysis prompt and the lenient response parser |
//! | [`store`] | `CacheStore` trait and in-memory backend |
//! | [`embedding`] | `EmbeddingProvider` trait, cosine similarity |
//! | [`index`] | `VectorIndex` trait, namespace restricts, in-memory index |
//! | [`metadata`] | `MetadataStore` trait, in-memory store, JSONL record parsing |
//! | [`llm`] | `TextGenerator` trait |

pub mod analysis;
pub mod embedding;
pub mod expansion;
pub mod fingerprint;
pub mod fusion;
pub mod hydrate;
pub mod index;
pub mod llm;
pub mod metadata;
pub mod models;
pub mod risk;
pub mod store;
