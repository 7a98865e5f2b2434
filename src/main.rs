//! # lexfuse CLI
//!
//! Retrieval, rank fusion and regulatory overlap/contradiction analysis
//! over a pre-built vector index of legal text.
//!
//! ## Usage
//!
//! ```bash
//! lexfuse --config ./config/lexfuse.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lexfuse init` | Create the SQLite response cache |
//! | `lexfuse retrieve "<query>"` | Fused retrieval over the vector index |
//! | `lexfuse analyze "<query>"` | Retrieval plus overlap/contradiction analysis |
//! | `lexfuse cache stats` | Entry and hit counts |
//! | `lexfuse cache clear` | Invalidate all (or prefixed) entries |
//! | `lexfuse parse <file>` | Run the analysis parser on a saved model response |
//!
//! ## Examples
//!
//! ```bash
//! lexfuse retrieve "data protection requirements" --top-k 10
//! lexfuse retrieve "capital requirements" --expand --min-year 2013
//! lexfuse analyze "liquidity coverage" --category financial_regulation --json
//! lexfuse cache clear --prefix analyze:
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` (default `lexfuse=info`).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lexfuse::models::{Filters, Query};
use lexfuse::{analyze_cmd, cache_cmd, config, migrate, parse_cmd, retrieve};

/// lexfuse: retrieval, fusion and analysis engine for regulatory text.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/lexfuse.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "lexfuse", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lexfuse.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Filters shared by `retrieve` and `analyze`.
#[derive(Args)]
struct FilterArgs {
    /// Only chunks from this exact year (index-side restrict).
    #[arg(long)]
    year: Option<i32>,

    /// Drop chunks older than this year.
    #[arg(long)]
    min_year: Option<i32>,

    /// Document type, e.g. `regulation` or `directive`.
    #[arg(long)]
    doc_type: Option<String>,

    /// Category namespace; known risk categories also filter by keyword.
    #[arg(long)]
    category: Option<String>,
}

impl FilterArgs {
    fn into_filters(self) -> Filters {
        Filters {
            year: self.year,
            min_year: self.min_year,
            doc_type: self.doc_type,
            category: self.category,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the response cache.
    ///
    /// Creates the SQLite file and the `response_cache` table. Idempotent.
    Init,

    /// Retrieve and fuse chunks for a query.
    Retrieve {
        query: String,

        /// Number of chunks to return (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Search alternate phrasings too and fuse the rankings.
        #[arg(long)]
        expand: bool,

        /// Print the JSON payload instead of a listing.
        #[arg(long)]
        json: bool,
    },

    /// Retrieve, then ask the language model for overlaps and contradictions.
    Analyze {
        query: String,

        /// Chunks retrieved for analysis (defaults to `analysis.top_k`).
        #[arg(long)]
        top_k: Option<usize>,

        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        expand: bool,

        /// Also report findings within a single regulation.
        #[arg(long)]
        include_same_regulation: bool,

        #[arg(long)]
        json: bool,
    },

    /// Inspect or clear the response cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Parse a saved analysis response and print the extracted records.
    Parse {
        /// File holding the raw model output.
        file: PathBuf,

        #[arg(long)]
        include_same_regulation: bool,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry and hit counts per kind.
    Stats,
    /// Delete cached responses.
    Clear {
        /// Only entries whose fingerprint starts with this (`retrieve:` or `analyze:`).
        #[arg(long)]
        prefix: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexfuse=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Parse {
        file,
        include_same_regulation,
        json,
    } = &cli.command
    {
        return parse_cmd::run_parse(file, !include_same_regulation, *json);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Cache initialized at {}.", cfg.cache.path.display());
        }
        Commands::Retrieve {
            query,
            top_k,
            filters,
            expand,
            json,
        } => {
            let query = Query::new(query, top_k.unwrap_or(cfg.retrieval.top_k))
                .with_filters(filters.into_filters())
                .with_expand(expand || cfg.retrieval.expand);
            retrieve::run_retrieve(&cfg, query, json).await?;
        }
        Commands::Analyze {
            query,
            top_k,
            filters,
            expand,
            include_same_regulation,
            json,
        } => {
            let cross_only = cfg.analysis.cross_regulation_only && !include_same_regulation;
            let query = Query::new(query, top_k.unwrap_or(cfg.analysis.top_k))
                .with_filters(filters.into_filters())
                .with_expand(expand || cfg.retrieval.expand)
                .with_cross_regulation_only(cross_only);
            analyze_cmd::run_analyze(&cfg, query, json).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Stats => cache_cmd::run_stats(&cfg).await?,
            CacheAction::Clear { prefix } => cache_cmd::run_clear(&cfg, prefix.as_deref()).await?,
        },
        Commands::Parse { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}
