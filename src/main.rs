//! # codesearch CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `codesearch build <alias> <path> [provider] [model] [extensions]` | Index a tree from scratch |
//! | `codesearch sync <alias>` | Reconcile the index with the tree |
//! | `codesearch find <alias> <query...>` | Search the index |
//!
//! Logs go to stderr and are filtered by `RUST_LOG` (default `info`).
//! Command results go to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use codesearch::config;
use codesearch::ingest::{self, BuildArgs};
use codesearch::progress::ProgressMode;
use codesearch::search::{self, FindMode, FindOptions};
use codesearch_core::CodesearchError;

/// codesearch: semantic search over a local source tree.
#[derive(Parser)]
#[command(
    name = "codesearch",
    about = "Index a source tree into vector embeddings and search it in natural language",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./codesearch.toml` when present, otherwise built-in
    /// defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or rebuild) a project index from scratch.
    ///
    /// Registers the project and embeds every matching file. An existing
    /// index for the alias is replaced.
    Build {
        /// Project alias; names the database file.
        alias: String,
        /// Root of the source tree. `.` means the current directory.
        path: String,
        /// Embedding provider: `litellm` or `ollama`.
        provider: Option<String>,
        /// Embedding model name.
        model: Option<String>,
        /// Comma-separated file extensions, e.g. `go,ts,yaml`.
        extensions: Option<String>,
    },

    /// Bring an existing index in line with the source tree.
    Sync {
        /// Project alias given to `build`.
        alias: String,
    },

    /// Search a project index.
    Find {
        /// Project alias given to `build`.
        alias: String,

        /// Query text; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Ranking preset.
        #[arg(long, value_enum, default_value_t = FindMode::Similarity)]
        mode: FindMode,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<usize>,

        /// Minimum similarity for `--mode similarity`.
        #[arg(long)]
        min_similarity: Option<f64>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current request");
            token.cancel();
        }
    });
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::resolve_config(cli.config.as_deref())?;
    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::Build {
            alias,
            path,
            provider,
            model,
            extensions,
        } => {
            let args = BuildArgs {
                alias,
                path,
                provider,
                model,
                extensions,
            };
            ingest::run_build(&cfg, &args, progress.as_ref(), cancel).await?;
        }
        Commands::Sync { alias } => {
            ingest::run_sync(&cfg, &alias, progress.as_ref(), cancel).await?;
        }
        Commands::Find {
            alias,
            query,
            mode,
            limit,
            min_similarity,
            json,
        } => {
            let opts = FindOptions {
                mode,
                limit,
                min_similarity,
                json,
            };
            search::run_find(&cfg, &alias, &query, &opts, cancel).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<CodesearchError>() {
                Some(CodesearchError::Cancelled) => eprintln!("Error: interrupted"),
                Some(e) if e.is_configuration() => eprintln!("Error: {}", e),
                _ => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}
