//! Brute-force cosine ranking over a corpus embedding table
//!
//! Every entry is scored, so a query costs O(n·d). Scores are cosine
//! similarities clamped into `[0, 1]`: opposite vectors and NaN both score 0.
//! The clamp gives callers a bounded relevance value and only makes sense
//! for this metric.

use crate::error::{PaperSearchError, Result};
use crate::types::{CorpusEmbeddingTable, PaperRecord};
use serde::{Deserialize, Serialize};

/// A corpus entry with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPaper {
    /// Position of the entry in the table
    pub index: usize,
    pub record: PaperRecord,
    /// Similarity in `[0, 1]`
    pub score: f32,
}

/// Scale `vector` to unit length
///
/// A zero vector is returned unchanged, so it scores 0 against everything.
///
/// ```
/// use papersearch_core::search::ranker::normalize;
///
/// assert_eq!(normalize(&[3.0, 4.0]), vec![0.6, 0.8]);
/// assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
/// ```
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm = l2_norm(vector);
    if norm > 0.0 {
        vector.iter().map(|x| x / norm).collect()
    } else {
        vector.to_vec()
    }
}

/// Cosine similarity of `a` and `b`, clamped into `[0, 1]`
///
/// # Errors
///
/// Returns `PaperSearchError::DimensionMismatch` when the lengths differ.
pub fn clamped_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(PaperSearchError::dimension_mismatch(a.len(), b.len()));
    }
    Ok(score_against(&normalize(a), b))
}

/// Top `k` entries of `table` by similarity to `query`
///
/// Ties keep corpus order. `k` larger than the table returns every entry.
///
/// # Errors
///
/// Returns `PaperSearchError::DimensionMismatch` when the query length differs
/// from the table's embedding dimension. An empty table always yields an empty
/// result.
pub fn rank(query: &[f32], table: &CorpusEmbeddingTable, k: usize) -> Result<Vec<RankedPaper>> {
    rank_where(query, table, k, |_| true)
}

/// Like [`rank`], restricted to records accepted by `predicate`
pub fn rank_where<F>(
    query: &[f32],
    table: &CorpusEmbeddingTable,
    k: usize,
    predicate: F,
) -> Result<Vec<RankedPaper>>
where
    F: Fn(&PaperRecord) -> bool,
{
    let dimension = match table.dimension() {
        Some(dimension) => dimension,
        None => return Ok(Vec::new()),
    };
    if query.len() != dimension {
        return Err(PaperSearchError::dimension_mismatch(dimension, query.len()));
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let query = normalize(query);

    let mut scored: Vec<(usize, f32)> = table
        .iter()
        .enumerate()
        .filter(|(_, (record, _))| predicate(record))
        .map(|(index, (_, embedding))| (index, score_against(&query, embedding)))
        .collect();

    // sort_by is stable, so equal scores stay in corpus order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);

    let records = table.records();
    Ok(scored
        .into_iter()
        .map(|(index, score)| RankedPaper {
            index,
            record: records[index].clone(),
            score,
        })
        .collect())
}

/// Dot product of a unit (or zero) query with `candidate` normalized on the fly
fn score_against(unit_query: &[f32], candidate: &[f32]) -> f32 {
    let norm = l2_norm(candidate);
    if norm == 0.0 {
        return 0.0;
    }

    let dot: f32 = unit_query
        .iter()
        .zip(candidate.iter())
        .map(|(q, c)| q * c)
        .sum();
    let score = dot / norm;

    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}
