//! File-proximity reranker
//!
//! Two passes over the candidate list. Anchor selection: the files of
//! the top three candidates by raw vector score form the anchor set.
//! Boost pass: candidates living in anchor files gain a fixed boost,
//! at most twice per file, so one large file cannot monopolize the
//! top-K. Final order is total score descending with vector score as
//! the tie-break, stable beyond that.

use std::collections::{HashMap, HashSet};

use repomind_parsing::Chunk;
use repomind_vector_data::ScoredChunk;
use serde::Serialize;

/// Boost granted to a chunk colocated with an anchor
pub const PROXIMITY_BOOST: f32 = 0.08;
/// Ceiling on the summed boost any single file can receive
pub const MAX_BOOST_PER_FILE: f32 = 0.16;
/// Top-N candidates whose files become anchors
const ANCHOR_COUNT: usize = 3;

/// A candidate after reranking
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub vector_score: f32,
    pub proximity_boost: f32,
    /// `vector_score + proximity_boost`
    pub score: f32,
}

/// Apply the proximity boost and re-sort
pub fn rerank_by_file_proximity(candidates: Vec<ScoredChunk>) -> Vec<RetrievedChunk> {
    // Anchor selection works on raw vector order
    let mut by_vector: Vec<&ScoredChunk> = candidates.iter().collect();
    by_vector.sort_by(|a, b| {
        b.vector_score
            .partial_cmp(&a.vector_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let anchor_files: HashSet<String> = by_vector
        .iter()
        .take(ANCHOR_COUNT)
        .map(|c| c.chunk.file_path.clone())
        .collect();

    // Boost pass in retrieval order; two boosted chunks per file at most
    let mut boosted_per_file: HashMap<String, u32> = HashMap::new();
    let max_boosted = (MAX_BOOST_PER_FILE / PROXIMITY_BOOST) as u32;

    let mut reranked: Vec<RetrievedChunk> = candidates
        .into_iter()
        .map(|candidate| {
            let in_anchor_file = anchor_files.contains(candidate.chunk.file_path.as_str());
            let boost = if in_anchor_file {
                let count = boosted_per_file
                    .entry(candidate.chunk.file_path.clone())
                    .or_insert(0);
                if *count < max_boosted {
                    *count += 1;
                    PROXIMITY_BOOST
                } else {
                    0.0
                }
            } else {
                0.0
            };
            RetrievedChunk {
                vector_score: candidate.vector_score,
                proximity_boost: boost,
                score: candidate.vector_score + boost,
                chunk: candidate.chunk,
            }
        })
        .collect();

    // Stable sort keeps retrieval order as the final tie-break
    reranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.vector_score
                    .partial_cmp(&a.vector_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    reranked
}
