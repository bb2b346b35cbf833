//! Error conditions that callers need to distinguish.
//!
//! Everything else travels as a plain [`anyhow::Error`]. These variants are
//! wrapped in `anyhow` as well and recovered with `downcast_ref`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodesearchError {
    /// No project row exists for the alias.
    #[error("project '{0}' not found; run `codesearch build {0} <path>` first")]
    ProjectNotFound(String),

    #[error("unsupported embedding provider: '{0}' (expected litellm or ollama)")]
    UnknownProvider(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("embedding provider returned an empty embedding")]
    EmptyEmbedding,

    #[error("vector dimension mismatch: index has {expected} dimensions, vector has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("operation cancelled")]
    Cancelled,
}

impl CodesearchError {
    /// True for errors raised before any I/O because the input was unusable.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CodesearchError::UnknownProvider(_) | CodesearchError::InvalidArgs(_)
        )
    }
}
