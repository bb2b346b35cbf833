//! Result ranking over raw nearest-neighbor hits.
//!
//! A KNN query always returns `k` hits no matter how unrelated they are.
//! [`rank`] turns that list into a bounded, relevance-filtered result set.
//!
//! # Algorithm
//!
//! 1. Empty input yields empty output.
//! 2. Pick a cutoff: `max_distance`, or with `adaptive` the midpoint of the
//!    largest gap among the first 20 distances when that gap exceeds
//!    [`MIN_GAP`] and the midpoint lies below `max_distance`.
//! 3. Keep hits with `distance <= cutoff`, at most `max_results`.
//! 4. If fewer than `min_results` survive, return the closest
//!    `min(min_results, hits, max_results)` raw hits instead.
//!
//! The ranker works on distances. [`search_by_similarity`] converts a
//! similarity threshold into a distance on the way in and distances back
//! into similarities on the way out.

use anyhow::Result;

use crate::models::SearchResult;
use crate::store::Store;

/// A gap must be wider than this to count as a relevance break.
pub const MIN_GAP: f64 = 0.05;

/// Only the first this-many hits are scanned for the adaptive gap.
pub const GAP_SCAN_WINDOW: usize = 20;

/// Lower bound on the number of KNN candidates fetched before ranking.
pub const MIN_CANDIDATES: usize = 100;

/// Ranking parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RankOptions {
    /// Hits farther than this are dropped (unless the floor kicks in).
    pub max_distance: f64,
    /// Return at least this many hits whenever any exist.
    pub min_results: usize,
    /// Never return more than this many hits.
    pub max_results: usize,
    /// Derive a tighter cutoff from the gap structure of the hits.
    pub adaptive: bool,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            max_distance: 0.8,
            min_results: 2,
            max_results: 20,
            adaptive: true,
        }
    }
}

impl RankOptions {
    /// Looser matching for "code like this" queries.
    pub fn similar_code() -> Self {
        Self {
            max_distance: 0.6,
            min_results: 3,
            max_results: 15,
            adaptive: true,
        }
    }

    /// Tight fixed threshold for near-duplicates.
    pub fn exact_code() -> Self {
        Self {
            max_distance: 0.3,
            min_results: 1,
            max_results: 10,
            adaptive: false,
        }
    }

    /// Options equivalent to a minimum similarity of `min_similarity`.
    pub fn similarity(min_similarity: f64, max_results: usize) -> Self {
        Self {
            max_distance: 1.0 - min_similarity,
            min_results: 1,
            max_results,
            adaptive: true,
        }
    }

    /// KNN candidate count needed to rank with these options.
    pub fn candidate_k(&self) -> usize {
        self.max_results.saturating_mul(2).max(MIN_CANDIDATES)
    }
}

/// Cutoff distance derived from the largest gap between consecutive hits.
///
/// `hits` must be ascending by distance. Falls back to `max_distance` when
/// there are fewer than two hits, no gap exceeds [`MIN_GAP`], or the gap
/// midpoint is not below `max_distance`.
pub fn adaptive_cutoff(hits: &[SearchResult], max_distance: f64) -> f64 {
    if hits.len() <= 1 {
        return max_distance;
    }

    let mut largest_gap = 0.0;
    let mut gap_index = 0;
    for i in 1..hits.len().min(GAP_SCAN_WINDOW) {
        let gap = hits[i].distance - hits[i - 1].distance;
        if gap > largest_gap {
            largest_gap = gap;
            gap_index = i;
        }
    }

    if largest_gap > MIN_GAP && gap_index > 0 {
        let cutoff = hits[gap_index - 1].distance + largest_gap / 2.0;
        if cutoff < max_distance {
            return cutoff;
        }
    }
    max_distance
}

/// Filter and bound raw KNN hits. `hits` must be ascending by distance.
pub fn rank(hits: Vec<SearchResult>, opts: &RankOptions) -> Vec<SearchResult> {
    if hits.is_empty() {
        return hits;
    }

    let cutoff = if opts.adaptive {
        adaptive_cutoff(&hits, opts.max_distance)
    } else {
        opts.max_distance
    };

    let kept: Vec<SearchResult> = hits
        .iter()
        .filter(|h| h.distance <= cutoff)
        .take(opts.max_results)
        .cloned()
        .collect();

    if kept.len() < opts.min_results {
        let floor = opts.min_results.min(hits.len()).min(opts.max_results);
        let mut hits = hits;
        hits.truncate(floor);
        return hits;
    }
    kept
}

/// Query the store and rank the hits.
///
/// Store failures are returned unchanged.
pub async fn search<S: Store + ?Sized>(
    store: &S,
    query_vec: &[f32],
    opts: &RankOptions,
) -> Result<Vec<SearchResult>> {
    let hits = store.knn(query_vec, opts.candidate_k()).await?;
    tracing::debug!(candidates = hits.len(), "ranking knn hits");
    Ok(rank(hits, opts))
}

/// Similarity-mode search: threshold and results are `1 - distance`.
pub async fn search_by_similarity<S: Store + ?Sized>(
    store: &S,
    query_vec: &[f32],
    min_similarity: f64,
    max_results: usize,
) -> Result<Vec<SearchResult>> {
    let opts = RankOptions::similarity(min_similarity, max_results);
    let mut results = search(store, query_vec, &opts).await?;
    for r in &mut results {
        r.distance = 1.0 - r.distance;
    }
    Ok(results)
}
