//! # codesearch core
//!
//! Storage-agnostic logic for codesearch: the data model, the [`store::Store`]
//! and [`embedding::Embedder`] seams, result ranking, and the reconciler that
//! keeps an indexed project in step with its source tree.
//!
//! This crate performs no SQL, HTTP, or filesystem access of its own. The
//! `codesearch` app crate supplies SQLite, HTTP, and filesystem backends;
//! the in-memory backends here ([`store::memory::InMemoryStore`],
//! [`source::MemorySource`]) serve tests and embedders of the library.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `Project`, `IndexedFile`, `SearchResult`, `SyncReport` |
//! | [`error`] | Typed errors callers need to tell apart |
//! | [`embedding`] | `Embedder` trait and vector encoding / distance helpers |
//! | [`store`] | `Store` trait and the in-memory implementation |
//! | [`source`] | `SourceTree` trait and the in-memory implementation |
//! | [`search`] | Result ranking: distance filter, adaptive cutoff, floor |
//! | [`reconcile`] | Rebuild and incremental sync |
//! | [`progress`] | Progress events emitted by the reconciler |

pub mod embedding;
pub mod error;
pub mod models;
pub mod progress;
pub mod reconcile;
pub mod search;
pub mod source;
pub mod store;

pub use error::CodesearchError;
pub use models::{IndexedFile, Project, SearchResult, SyncReport};
