//! # codesearch
//!
//! Index a local source tree into vector embeddings and search it in natural
//! language.
//!
//! Each project gets its own SQLite database holding one embedding per file.
//! `build` embeds everything from scratch, `sync` reconciles the index with
//! the tree (adds, re-embeds, removes), and `find` embeds a query and ranks
//! the nearest files.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Source tree │──▶│  Reconciler  │──▶│   SQLite     │
//! │  (walkdir)  │   │ embed + diff │   │ files + vecs │
//! └─────────────┘   └──────┬───────┘   └──────┬───────┘
//!                          │                  │
//!                          ▼                  ▼
//!                   ┌──────────────┐   ┌──────────────┐
//!                   │   Embedder   │   │    Ranker    │
//!                   │ litellm/olla │   │ knn + cutoff │
//!                   └──────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! codesearch build backend ./services/backend ollama nomic-embed-text go,yaml
//! codesearch sync backend
//! codesearch find backend "where are retries configured"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Per-project database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`embedding`] | litellm and ollama HTTP embedders |
//! | [`connector_fs`] | Filesystem source tree |
//! | [`ingest`] | `build` and `sync` commands |
//! | [`search`] | `find` command |
//! | [`progress`] | Stderr progress reporters |
//!
//! The storage-agnostic logic (ranking, reconciliation, data model) lives in
//! the `codesearch-core` crate.

pub mod config;
pub mod connector_fs;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod migrate;
pub mod progress;
pub mod search;
pub mod sqlite_store;
