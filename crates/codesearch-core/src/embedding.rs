//! Embedder trait and vector utilities.
//!
//! The [`Embedder`] trait is the only thing the reconciler and the search
//! path know about an embedding backend. HTTP implementations (litellm,
//! ollama) live in the `codesearch` app crate.
//!
//! Vectors are persisted as little-endian `f32` blobs and compared with
//! cosine distance (`1 - cosine_similarity`), which lies in `[0, 2]`.

use anyhow::{bail, Result};
use async_trait::async_trait;

/// Maps text to a fixed-dimension vector.
///
/// Implementations own their retry policy. Any error they return is treated
/// as final for the text in question.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, used in log lines.
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Encode a vector as a blob of `len * 4` little-endian bytes.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a blob produced by [`encode_vector`].
///
/// Fails on a blob whose length is not a multiple of four.
pub fn decode_vector(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        bail!(
            "malformed vector blob: {} bytes is not a multiple of 4",
            blob.len()
        );
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity in `[-1, 1]`, `0.0` for zero-length or zero-norm input.
///
/// Callers must check that the lengths agree; mismatched input yields `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }
    (dot / denom).clamp(-1.0, 1.0)
}

/// Cosine distance, `1 - cosine_similarity`, in `[0, 2]`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b)
}
