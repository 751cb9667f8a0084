//! Ambiguity scoring for narrowing decisions.
//!
//! This module is the decision procedure at the heart of the kernel: given a
//! ranked candidate list for one layer, decide whether retrieval confidence
//! is good enough to continue narrowing or whether the turn must pause and
//! ask exactly one clarifying question.
//!
//! ## Decision Rule
//!
//! Over candidates sorted by similarity descending:
//! 1. Drop candidates below `min_sim`. Zero survivors: [`Decision::Empty`].
//! 2. One survivor: resolved.
//! 3. Gap between rank-1 and rank-2 at least `decisive_gap`: resolved with
//!    rank-1 only.
//! 4. Otherwise: clarify, with the discriminating dimension chosen from the
//!    facets of every survivor within `decisive_gap` of rank-1.
//!
//! The same rule runs at every layer; only the thresholds differ. The
//! Section layer uses a tighter `decisive_gap` since over-asking at the
//! finest layer is the most expensive for the user.
//!
//! ## Pair Acceptance
//!
//! At the Project layer the caller may tolerate a two-way tie after an
//! answered clarification (`tolerate_pair`): when the top two remain within
//! `pair_margin` and rank-3 trails decisively, both projects are accepted as
//! a merged scope instead of spending the final clarification attempt.

use serde::{Deserialize, Serialize};

use crate::types::ScoredCandidate;

// ============================================================================
// Threshold defaults
// ============================================================================

/// Default minimum similarity floor.
pub const DEFAULT_MIN_SIM: f32 = 0.30;

/// Default decisive rank-1/rank-2 gap for the Project and Document layers.
pub const DEFAULT_DECISIVE_GAP: f32 = 0.08;

/// Default decisive gap for the Section layer.
pub const DEFAULT_SECTION_DECISIVE_GAP: f32 = 0.05;

/// Default candidate pool size per retrieval call.
pub const DEFAULT_TOP_K: usize = 5;

/// Default margin within which two leading projects count as a pair.
pub const DEFAULT_PAIR_MARGIN: f32 = 0.02;

// ============================================================================
// LayerThresholds
// ============================================================================

/// Per-layer scoring thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerThresholds {
    /// Minimum similarity for a candidate to be considered at all.
    pub min_sim: f32,

    /// Rank-1/rank-2 gap at which rank-1 wins outright.
    pub decisive_gap: f32,

    /// Candidate pool size per retrieval call.
    pub top_k: usize,

    /// Margin for two-way pair acceptance (Project layer only).
    pub pair_margin: f32,
}

impl Default for LayerThresholds {
    fn default() -> Self {
        Self {
            min_sim: DEFAULT_MIN_SIM,
            decisive_gap: DEFAULT_DECISIVE_GAP,
            top_k: DEFAULT_TOP_K,
            pair_margin: DEFAULT_PAIR_MARGIN,
        }
    }
}

// ============================================================================
// DiscriminatingDimension
// ============================================================================

/// The attribute along which ambiguous candidates differ most cleanly.
///
/// Drives question generation: a question names the actual distinguishing
/// values of this dimension, never a generic "could you clarify?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscriminatingDimension {
    /// Candidates differ by document type.
    DocType,
    /// Candidates differ by dominant theme set.
    Themes,
    /// Candidates differ by key topics.
    Topics,
    /// Candidates differ by section title.
    Title,
    /// Fallback: distinguish candidates by their own labels.
    Identity,
}

impl std::fmt::Display for DiscriminatingDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocType => write!(f, "document type"),
            Self::Themes => write!(f, "themes"),
            Self::Topics => write!(f, "topics"),
            Self::Title => write!(f, "title"),
            Self::Identity => write!(f, "identity"),
        }
    }
}

// ============================================================================
// Decision
// ============================================================================

/// Outcome of scoring one ranked candidate list.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Confidence is good enough; narrowing continues with these ids.
    ///
    /// A singleton except for Project-layer pair acceptance.
    Resolved(Vec<String>),

    /// Ambiguity persists; no entity is selected.
    Clarify {
        /// The attribute the clarifying question should split on.
        dimension: DiscriminatingDimension,
        /// The ambiguous candidates (all within `decisive_gap` of rank-1).
        candidates: Vec<ScoredCandidate>,
    },

    /// No candidate cleared the similarity floor.
    ///
    /// Distinct from clarify: there is nothing to disambiguate.
    Empty,
}

// ============================================================================
// Scoring
// ============================================================================

/// Decide CONTINUE vs CLARIFY vs EMPTY for a ranked candidate list.
///
/// `candidates` must already be sorted by similarity descending (id
/// ascending on ties). Pure function: same inputs always produce the same
/// decision.
pub fn decide(
    candidates: &[ScoredCandidate],
    thresholds: &LayerThresholds,
    tolerate_pair: bool,
) -> Decision {
    let surviving: Vec<&ScoredCandidate> = candidates
        .iter()
        .filter(|c| c.similarity >= thresholds.min_sim)
        .collect();

    let Some(top) = surviving.first() else {
        return Decision::Empty;
    };

    if surviving.len() == 1 {
        return Decision::Resolved(vec![top.id.clone()]);
    }

    let runner_up = surviving[1];
    let gap = top.similarity - runner_up.similarity;
    if gap >= thresholds.decisive_gap {
        return Decision::Resolved(vec![top.id.clone()]);
    }

    // Two leaders locked together after a clarification already failed to
    // separate them: accept both as a merged scope rather than burn the
    // remaining budget on the same question.
    if tolerate_pair && gap <= thresholds.pair_margin {
        let third_trails = surviving
            .get(2)
            .map(|third| runner_up.similarity - third.similarity >= thresholds.decisive_gap)
            .unwrap_or(true);
        if third_trails {
            return Decision::Resolved(vec![top.id.clone(), runner_up.id.clone()]);
        }
    }

    let ambiguous: Vec<ScoredCandidate> = surviving
        .iter()
        .filter(|c| top.similarity - c.similarity < thresholds.decisive_gap)
        .map(|c| (*c).clone())
        .collect();

    Decision::Clarify {
        dimension: select_dimension(&ambiguous),
        candidates: ambiguous,
    }
}

// ============================================================================
// Discriminating-dimension selection
// ============================================================================

/// Choose the facet that best splits the ambiguous candidates.
///
/// A facet is eligible when it takes more than one distinct value across the
/// set (a facet everyone shares cannot discriminate). Among eligible facets
/// the one with the fewest distinct values wins: fewer branches make a
/// cleaner question. Ties fall to the fixed priority doc type > themes >
/// topics > title; candidate identity is the always-eligible fallback.
pub fn select_dimension(candidates: &[ScoredCandidate]) -> DiscriminatingDimension {
    let dimensions = [
        (
            DiscriminatingDimension::DocType,
            distinct_values(candidates, |c| c.facets.doc_type.clone()),
        ),
        (
            DiscriminatingDimension::Themes,
            distinct_values(candidates, |c| {
                (!c.facets.themes.is_empty())
                    .then(|| c.facets.themes.iter().cloned().collect::<Vec<_>>().join(", "))
            }),
        ),
        (
            DiscriminatingDimension::Topics,
            distinct_values(candidates, |c| {
                (!c.facets.topics.is_empty())
                    .then(|| c.facets.topics.iter().cloned().collect::<Vec<_>>().join(", "))
            }),
        ),
        (
            DiscriminatingDimension::Title,
            distinct_values(candidates, |c| c.facets.title.clone()),
        ),
    ];

    dimensions
        .into_iter()
        .filter(|(_, distinct)| *distinct > 1)
        .min_by_key(|(_, distinct)| *distinct)
        .map(|(dimension, _)| dimension)
        .unwrap_or(DiscriminatingDimension::Identity)
}

/// Number of distinct non-missing values a facet takes across candidates.
///
/// Returns 0 when any candidate is missing the facet, which makes the facet
/// ineligible: a question cannot split candidates it cannot describe.
fn distinct_values<F>(candidates: &[ScoredCandidate], facet: F) -> usize
where
    F: Fn(&ScoredCandidate) -> Option<String>,
{
    let mut values = std::collections::BTreeSet::new();
    for candidate in candidates {
        match facet(candidate) {
            Some(value) => {
                values.insert(value);
            }
            None => return 0,
        }
    }
    values.len()
}

// ============================================================================
// Tests
// ============================================================================
