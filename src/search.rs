//! `find` command: embed a query and print the ranked files.

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use codesearch_core::embedding::Embedder;
use codesearch_core::search::{search, search_by_similarity, RankOptions};
use codesearch_core::{CodesearchError, SearchResult};

use crate::config::Config;
use crate::db;
use crate::embedding::HttpEmbedder;
use crate::ingest::load_project;
use crate::sqlite_store::SqliteStore;

/// Ranking preset for `find --mode`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum FindMode {
    /// Minimum-similarity threshold; scores are similarities.
    #[default]
    Similarity,
    /// Default distance options with adaptive cutoff.
    Default,
    /// Looser matching for related code.
    Similar,
    /// Tight threshold for near-duplicates.
    Exact,
}

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub mode: FindMode,
    pub limit: Option<usize>,
    pub min_similarity: Option<f64>,
    pub json: bool,
}

#[derive(Serialize)]
struct FindOutput<'a> {
    query: &'a str,
    mode: &'static str,
    results: &'a [SearchResult],
}

impl FindMode {
    fn as_str(&self) -> &'static str {
        match self {
            FindMode::Similarity => "similarity",
            FindMode::Default => "default",
            FindMode::Similar => "similar",
            FindMode::Exact => "exact",
        }
    }
}

/// Join the query words and reject a blank query.
pub fn normalize_query(words: &[String]) -> Result<String> {
    let query = words.join(" ").trim().to_string();
    if query.is_empty() {
        return Err(CodesearchError::InvalidArgs("search query must not be empty".into()).into());
    }
    Ok(query)
}

pub async fn run_find(
    config: &Config,
    alias: &str,
    words: &[String],
    opts: &FindOptions,
    cancel: CancellationToken,
) -> Result<Vec<SearchResult>> {
    let query = normalize_query(words)?;
    db::validate_alias(alias)?;
    let limit = opts.limit.unwrap_or(config.search.limit);
    if limit < 1 {
        return Err(CodesearchError::InvalidArgs("--limit must be >= 1".into()).into());
    }
    let min_similarity = opts.min_similarity.unwrap_or(config.search.min_similarity);
    if !(0.0..1.0).contains(&min_similarity) {
        return Err(
            CodesearchError::InvalidArgs("--min-similarity must be in [0.0, 1.0)".into()).into(),
        );
    }

    let pool = db::connect_existing(config, alias).await?;
    let store = SqliteStore::new(pool);
    let project = load_project(&store, alias).await?;
    let embedder = HttpEmbedder::from_provider_name(&project.provider, &project.model, config)?;

    if !opts.json {
        println!("Searching for: {}", query);
    }

    let query_vec = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CodesearchError::Cancelled.into()),
        result = embedder.embed(&query) => result.context("error generating query embedding")?,
    };
    if query_vec.is_empty() {
        return Err(CodesearchError::EmptyEmbedding.into());
    }

    let results = match opts.mode {
        FindMode::Similarity => {
            search_by_similarity(&store, &query_vec, min_similarity, limit).await?
        }
        FindMode::Default => {
            search(&store, &query_vec, &with_limit(RankOptions::default(), opts.limit)).await?
        }
        FindMode::Similar => {
            search(&store, &query_vec, &with_limit(RankOptions::similar_code(), opts.limit)).await?
        }
        FindMode::Exact => {
            search(&store, &query_vec, &with_limit(RankOptions::exact_code(), opts.limit)).await?
        }
    };
    store.pool().close().await;

    if opts.json {
        let output = FindOutput {
            query: &query,
            mode: opts.mode.as_str(),
            results: &results,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Found {} files", results.len());
        for result in &results {
            println!("{} \t ({:.6} {})", result.path, result.distance, result.id);
        }
    }

    Ok(results)
}

/// Presets keep their own `max_results` unless `--limit` was given.
fn with_limit(mut opts: RankOptions, limit: Option<usize>) -> RankOptions {
    if let Some(limit) = limit {
        opts.max_results = limit;
    }
    opts
}
