//! Clarifying question generation.
//!
//! The Ambiguity Scorer decides *what* to ask about (the discriminating
//! dimension); this module turns that decision into one natural-language
//! question naming the actual distinguishing values. Phrasing may be
//! delegated to an external text-generation collaborator through
//! [`QuestionPhraser`]; when that collaborator fails, the deterministic
//! template takes over so a clarification is always presentable.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::scorer::DiscriminatingDimension;
use crate::types::{Layer, ScoredCandidate};

// ============================================================================
// ClarifyingQuestion
// ============================================================================

/// One option the user can pick in response to a clarifying question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarifyOption {
    /// Candidate entity id.
    pub id: String,

    /// The distinguishing value shown for this candidate.
    pub value: String,
}

/// A generated clarifying question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarifyingQuestion {
    /// The layer that is ambiguous.
    pub layer: Layer,

    /// The dimension the question splits on.
    pub dimension: DiscriminatingDimension,

    /// The question text.
    pub question: String,

    /// Candidate options, in rank order.
    pub options: Vec<ClarifyOption>,
}

// ============================================================================
// QuestionPhraser
// ============================================================================

/// Phrases a clarifying question from a dimension and candidate set.
///
/// The *decision* of what to ask is kernel logic; only the wording may be
/// delegated. Implementations may call out to a text-generation service.
pub trait QuestionPhraser: Send + Sync {
    /// Produce question text for the given dimension and candidates.
    fn phrase(
        &self,
        layer: Layer,
        dimension: DiscriminatingDimension,
        candidates: &[ScoredCandidate],
    ) -> anyhow::Result<String>;
}

/// Deterministic template phraser.
///
/// Always succeeds; used directly and as the fallback for failing external
/// phrasers.
#[derive(Debug, Clone, Default)]
pub struct TemplatePhraser;

impl QuestionPhraser for TemplatePhraser {
    fn phrase(
        &self,
        layer: Layer,
        dimension: DiscriminatingDimension,
        candidates: &[ScoredCandidate],
    ) -> anyhow::Result<String> {
        Ok(template_question(layer, dimension, candidates))
    }
}

// ============================================================================
// Question generation
// ============================================================================

/// Generate a clarifying question, falling back to the deterministic
/// template when the configured phraser fails.
pub fn generate_question(
    phraser: &dyn QuestionPhraser,
    layer: Layer,
    dimension: DiscriminatingDimension,
    candidates: &[ScoredCandidate],
) -> ClarifyingQuestion {
    let question = match phraser.phrase(layer, dimension, candidates) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!("Question phraser returned empty text, using template");
            template_question(layer, dimension, candidates)
        }
        Err(e) => {
            warn!("Question phraser failed ({}), using template", e);
            template_question(layer, dimension, candidates)
        }
    };

    ClarifyingQuestion {
        layer,
        dimension,
        question,
        options: candidates
            .iter()
            .map(|c| ClarifyOption {
                id: c.id.clone(),
                value: distinguishing_value(dimension, c, candidates),
            })
            .collect(),
    }
}

/// The deterministic question template.
fn template_question(
    layer: Layer,
    dimension: DiscriminatingDimension,
    candidates: &[ScoredCandidate],
) -> String {
    let values: Vec<String> = candidates
        .iter()
        .map(|c| distinguishing_value(dimension, c, candidates))
        .collect();
    let listed = list_values(&values);

    match dimension {
        DiscriminatingDimension::DocType => {
            format!("Which kind of document are you after: {}?", listed)
        }
        DiscriminatingDimension::Themes => {
            format!("Which area is your question about: {}?", listed)
        }
        DiscriminatingDimension::Topics => {
            format!("Which topic do you mean: {}?", listed)
        }
        DiscriminatingDimension::Title => {
            format!("Which section do you mean: {}?", listed)
        }
        DiscriminatingDimension::Identity => match layer {
            Layer::Project => format!("Which project do you mean: {}?", listed),
            Layer::Document => format!("Which document do you mean: {}?", listed),
            Layer::Section => format!("Which section do you mean: {}?", listed),
        },
    }
}

/// The value that distinguishes `candidate` from the others on `dimension`.
fn distinguishing_value(
    dimension: DiscriminatingDimension,
    candidate: &ScoredCandidate,
    all: &[ScoredCandidate],
) -> String {
    match dimension {
        DiscriminatingDimension::DocType => candidate
            .facets
            .doc_type
            .clone()
            .unwrap_or_else(|| candidate.label().to_string()),
        DiscriminatingDimension::Title => candidate
            .facets
            .title
            .clone()
            .unwrap_or_else(|| candidate.label().to_string()),
        DiscriminatingDimension::Themes => {
            distinctive_set_values(&candidate.facets.themes, all, |c| &c.facets.themes)
                .unwrap_or_else(|| candidate.label().to_string())
        }
        DiscriminatingDimension::Topics => {
            distinctive_set_values(&candidate.facets.topics, all, |c| &c.facets.topics)
                .unwrap_or_else(|| candidate.label().to_string())
        }
        DiscriminatingDimension::Identity => candidate.label().to_string(),
    }
}

/// Elements of `own` that no other candidate shares, joined for display.
fn distinctive_set_values<F>(
    own: &std::collections::BTreeSet<String>,
    all: &[ScoredCandidate],
    facet: F,
) -> Option<String>
where
    F: Fn(&ScoredCandidate) -> &std::collections::BTreeSet<String>,
{
    let others: std::collections::BTreeSet<&String> = all
        .iter()
        .filter(|c| facet(c) != own)
        .flat_map(|c| facet(c).iter())
        .collect();

    let distinctive: Vec<&str> = own
        .iter()
        .filter(|v| !others.contains(v))
        .map(|s| s.as_str())
        .collect();

    if distinctive.is_empty() {
        None
    } else {
        Some(distinctive.join(", "))
    }
}

/// "a or b" / "a, b, or c" value listing.
fn list_values(values: &[String]) -> String {
    match values {
        [] => String::new(),
        [only] => only.clone(),
        [a, b] => format!("{} or {}", a, b),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    }
}

// ============================================================================
// Tests
// ============================================================================
