//! Scoped similarity search over descriptor records.
//!
//! Descriptor catalogs hold at most a few hundred records per layer, so the
//! search is a rayon-parallel linear cosine scan. Result ordering is fully
//! deterministic: similarity descending, ties broken by record id ascending.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::DescriptorRecord;

// ============================================================================
// ScoredHit
// ============================================================================

/// A single result from a scoped similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredHit {
    /// Record id.
    pub id: String,

    /// Cosine similarity against the query vector.
    pub score: f32,

    /// Denormalized owning project id (None for project records).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Attribute payload carried by the record.
    pub attributes: serde_json::Value,
}

// ============================================================================
// Cosine similarity
// ============================================================================

/// Cosine similarity between two equal-length vectors.
///
/// Returns 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom > 0.0 {
        dot / denom
    } else {
        0.0
    }
}

// ============================================================================
// Scoped scan
// ============================================================================

/// Scan `records` for the `top_k` nearest to `query`, restricted to records
/// whose `parent_id` is in `scope` (or all records when `scope` is `None`).
pub fn scan_scoped(
    records: &[DescriptorRecord],
    scope: Option<&[String]>,
    query: &[f32],
    top_k: usize,
) -> Vec<ScoredHit> {
    let mut hits: Vec<ScoredHit> = records
        .par_iter()
        .filter(|record| match scope {
            Some(parents) => record
                .parent_id
                .as_deref()
                .map(|p| parents.iter().any(|s| s == p))
                .unwrap_or(false),
            None => true,
        })
        .map(|record| ScoredHit {
            id: record.id.clone(),
            score: cosine_similarity(&record.embedding, query),
            project_id: record.project_id.clone(),
            attributes: record.attributes.clone(),
        })
        .collect();

    sort_hits(&mut hits);
    hits.truncate(top_k);
    hits
}

/// Sort hits by similarity descending, ties broken by id ascending.
///
/// NaN scores (possible only from corrupt vectors) sort last.
pub fn sort_hits(hits: &mut [ScoredHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or_else(|| match (a.score.is_nan(), b.score.is_nan()) {
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                _ => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.id.cmp(&b.id))
    });
}

// ============================================================================
// Tests
// ============================================================================
