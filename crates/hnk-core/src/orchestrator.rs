//! Narrowing orchestrator: the state machine over the three layers.
//!
//! The orchestrator is the only component aware of all three layers at
//! once. Each user turn is processed as a pure transition over the stored
//! [`NarrowingState`]: resume or begin an episode, run layer engines until
//! one of them suspends (clarification) or the episode terminates, and
//! return a single outcome.
//!
//! ## Outcome shape
//!
//! - a clarifying question (episode suspended, same layer resumes next turn)
//! - a final result (document identity, page range, excerpt)
//! - a partial result (document resolved, no matching section)
//! - a structured no-match (nothing cleared the similarity floor; the
//!   deepest resolved scope is reported, never silently widened)
//!
//! Clarification budgets guarantee termination: a layer may re-enter
//! clarification after an answered question, but past `max_attempts` the
//! episode fails with `ClarificationExhausted` carrying the best partial
//! scope.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clarify::{generate_question, ClarifyOption, QuestionPhraser};
use crate::config::NarrowingConfig;
use crate::errors::HnkError;
use crate::layer::LayerEngine;
use crate::scorer::Decision;
use crate::session::{NarrowingState, PendingClarification, Stage};
use crate::types::{Layer, ProfileSearch, QueryEmbedder, Scope};

// ============================================================================
// TurnOutcome
// ============================================================================

/// What a processed turn hands back to the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TurnOutcome {
    /// The pipeline is suspended on a clarifying question.
    #[serde(rename_all = "camelCase")]
    Question {
        /// The ambiguous layer.
        layer: Layer,
        /// The question text.
        question: String,
        /// Candidate options, in rank order.
        options: Vec<ClarifyOption>,
    },

    /// Narrowing completed down to a section.
    #[serde(rename_all = "camelCase")]
    Final {
        /// Resolved project.
        project_id: String,
        /// Resolved document.
        document_id: String,
        /// Resolved section.
        section_id: String,
        /// Section title.
        title: String,
        /// First page of the section.
        page_start: u32,
        /// Last page of the section.
        page_end: u32,
        /// Stored excerpt for answer synthesis.
        excerpt: String,
    },

    /// Document resolved but no section cleared the floor.
    ///
    /// More useful than nothing; reported as partial, never as final.
    #[serde(rename_all = "camelCase")]
    Partial {
        /// Resolved project scope.
        project_ids: Vec<String>,
        /// Resolved document.
        document_id: String,
        /// Human-readable status ("no matching section").
        status: String,
    },

    /// Nothing cleared the similarity floor at a coarse layer.
    #[serde(rename_all = "camelCase")]
    NoMatch {
        /// The layer that came up empty.
        layer: Layer,
        /// Deepest resolved project scope, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_ids: Option<Vec<String>>,
        /// Deepest resolved document, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        document_id: Option<String>,
    },

    /// Acknowledgment of an inline session command.
    #[serde(rename_all = "camelCase")]
    Notice {
        /// The acknowledgment text.
        message: String,
    },
}

impl TurnOutcome {
    /// Discriminant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Question { .. } => "question",
            Self::Final { .. } => "final",
            Self::Partial { .. } => "partial",
            Self::NoMatch { .. } => "noMatch",
            Self::Notice { .. } => "notice",
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Drives the three layer engines over durable session state.
pub struct Orchestrator<'a> {
    config: &'a NarrowingConfig,
    embedder: &'a dyn QueryEmbedder,
    store: &'a dyn ProfileSearch,
    phraser: &'a dyn QuestionPhraser,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator over the given collaborators.
    pub fn new(
        config: &'a NarrowingConfig,
        embedder: &'a dyn QueryEmbedder,
        store: &'a dyn ProfileSearch,
        phraser: &'a dyn QuestionPhraser,
    ) -> Self {
        Self {
            config,
            embedder,
            store,
            phraser,
        }
    }

    /// Process one user turn against the session state.
    ///
    /// Mutates `state` in place; the caller persists it afterwards (also on
    /// error, so a failed turn does not lose locks).
    pub fn run_turn(
        &self,
        state: &mut NarrowingState,
        message: &str,
    ) -> Result<TurnOutcome, HnkError> {
        match state.stage {
            Stage::AwaitingClarification { return_layer } if state.pending.is_some() => {
                debug!(
                    session = %state.session_id,
                    layer = %return_layer,
                    "Resuming suspended episode with clarification answer"
                );
                state.refinements.push(message.trim().to_string());
                state.pending = None;
                state.stage = stage_for(return_layer);
            }
            _ => {
                debug!(session = %state.session_id, "Beginning new narrowing episode");
                state.begin_episode(message.trim());
            }
        }
        state.touch();

        loop {
            let layer = match state.stage {
                Stage::AtProject => Layer::Project,
                Stage::AtDocument => Layer::Document,
                Stage::AtSection => Layer::Section,
                Stage::Done | Stage::AwaitingClarification { .. } => {
                    // Loop entry normalizes the stage; anything else is a bug.
                    return Err(HnkError::Other(anyhow::anyhow!(
                        "orchestrator entered turn loop in stage {:?}",
                        state.stage
                    )));
                }
            };

            let scope = self.scope_for(layer, state)?;
            let tolerate_pair = layer == Layer::Project && state.attempts.project > 0;
            let engine = LayerEngine::new(layer, self.config.thresholds(layer));
            let decision = engine.narrow(
                &state.refined_query(),
                &scope,
                tolerate_pair,
                self.embedder,
                self.store,
            )?;

            match decision {
                Decision::Resolved(ids) => {
                    if let Some(outcome) = self.advance(state, layer, ids)? {
                        return Ok(outcome);
                    }
                }
                Decision::Clarify {
                    dimension,
                    candidates,
                } => {
                    let spent = state.attempts.get(layer);
                    if spent >= self.config.max_attempts_per_layer {
                        info!(
                            session = %state.session_id,
                            layer = %layer,
                            attempts = spent,
                            "Clarification budget exhausted"
                        );
                        let error = HnkError::ClarificationExhausted {
                            layer,
                            attempts: spent,
                            project_ids: state.project_lock.clone(),
                            document_id: state.document_lock.clone(),
                        };
                        state.pending = None;
                        state.stage = Stage::Done;
                        return Err(error);
                    }

                    state.attempts.bump(layer);
                    let question =
                        generate_question(self.phraser, layer, dimension, &candidates);
                    state.pending = Some(PendingClarification {
                        layer,
                        dimension,
                        candidate_ids: candidates.iter().map(|c| c.id.clone()).collect(),
                        question: question.question.clone(),
                        asked_at: chrono::Utc::now(),
                    });
                    state.stage = Stage::AwaitingClarification {
                        return_layer: layer,
                    };
                    return Ok(TurnOutcome::Question {
                        layer,
                        question: question.question,
                        options: question.options,
                    });
                }
                Decision::Empty => {
                    state.stage = Stage::Done;
                    return Ok(match layer {
                        Layer::Section => TurnOutcome::Partial {
                            project_ids: state.project_lock.clone().unwrap_or_default(),
                            document_id: state.document_lock.clone().unwrap_or_default(),
                            status: "no matching section".to_string(),
                        },
                        _ => TurnOutcome::NoMatch {
                            layer,
                            project_ids: state.project_lock.clone(),
                            document_id: state.document_lock.clone(),
                        },
                    });
                }
            }
        }
    }

    /// Record a resolved layer and move the state machine forward.
    ///
    /// Returns the terminal outcome when the Section layer resolved.
    fn advance(
        &self,
        state: &mut NarrowingState,
        layer: Layer,
        ids: Vec<String>,
    ) -> Result<Option<TurnOutcome>, HnkError> {
        debug!(
            session = %state.session_id,
            layer = %layer,
            resolved = ?ids,
            "Layer resolved"
        );
        match layer {
            Layer::Project => {
                state.project_lock = Some(ids);
                state.stage = Stage::AtDocument;
                Ok(None)
            }
            Layer::Document => {
                let document_id = ids.into_iter().next().ok_or_else(|| {
                    HnkError::Other(anyhow::anyhow!("document layer resolved to empty set"))
                })?;
                state.document_lock = Some(document_id);
                state.stage = Stage::AtSection;
                Ok(None)
            }
            Layer::Section => {
                let section_id = ids.into_iter().next().ok_or_else(|| {
                    HnkError::Other(anyhow::anyhow!("section layer resolved to empty set"))
                })?;
                let section = self.store.section(&section_id)?.ok_or_else(|| {
                    HnkError::CatalogIntegrity(format!(
                        "resolved section '{}' vanished from the catalog",
                        section_id
                    ))
                })?;

                // The scoped search cannot leak across projects; a mismatch
                // here means the catalog itself is inconsistent.
                if let Some(lock) = &state.project_lock {
                    if !lock.contains(&section.project_id) {
                        return Err(HnkError::CatalogIntegrity(format!(
                            "section '{}' belongs to project '{}', outside the session lock",
                            section.section_id, section.project_id
                        )));
                    }
                }

                state.stage = Stage::Done;
                Ok(Some(TurnOutcome::Final {
                    project_id: section.project_id.clone(),
                    document_id: section.document_id.clone(),
                    section_id: section.section_id.clone(),
                    title: section.title.clone(),
                    page_start: section.pages.start,
                    page_end: section.pages.end,
                    excerpt: section.excerpt,
                }))
            }
        }
    }

    /// Scope for a layer, derived from the locks above it.
    fn scope_for(&self, layer: Layer, state: &NarrowingState) -> Result<Scope, HnkError> {
        match layer {
            Layer::Project => Ok(Scope::All),
            Layer::Document => state
                .project_lock
                .clone()
                .map(Scope::Parents)
                .ok_or_else(|| {
                    HnkError::InvalidLockState(
                        "document layer reached without a project lock".to_string(),
                    )
                }),
            Layer::Section => state
                .document_lock
                .clone()
                .map(|id| Scope::Parents(vec![id]))
                .ok_or_else(|| {
                    HnkError::InvalidLockState(
                        "section layer reached without a document lock".to_string(),
                    )
                }),
        }
    }
}

fn stage_for(layer: Layer) -> Stage {
    match layer {
        Layer::Project => Stage::AtProject,
        Layer::Document => Stage::AtDocument,
        Layer::Section => Stage::AtSection,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clarify::TemplatePhraser;
    use crate::descriptor::{PageRange, SectionRecord};
    use crate::types::{CandidateFacets, ScoredCandidate};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Embedder stub with a fixed vector.
    #[derive(Debug)]
    struct FixedEmbedder;

    impl QueryEmbedder for FixedEmbedder {
        fn embed_query(&self, _text: &str) -> Result<Vec<f32>, HnkError> {
            Ok(vec![1.0])
        }
        fn model_id(&self) -> &str {
            "fixed"
        }
        fn dimension(&self) -> usize {
            1
        }
    }

    /// Store stub replaying scripted per-layer result queues.
    ///
    /// Each search at a layer pops the next scripted candidate list; the
    /// last list repeats once the queue drains.
    struct ScriptedStore {
        scripts: Mutex<HashMap<Layer, Vec<Vec<ScoredCandidate>>>>,
        sections: HashMap<String, SectionRecord>,
    }

    impl ScriptedStore {
        fn new(scripts: HashMap<Layer, Vec<Vec<ScoredCandidate>>>) -> Self {
            Self {
                scripts: Mutex::new(scripts),
                sections: HashMap::new(),
            }
        }

        fn with_section(mut self, section: SectionRecord) -> Self {
            self.sections.insert(section.section_id.clone(), section);
            self
        }
    }

    impl ProfileSearch for ScriptedStore {
        fn search(
            &self,
            layer: Layer,
            _scope: Option<&[String]>,
            _query: &[f32],
            _top_k: usize,
        ) -> Result<Vec<ScoredCandidate>, HnkError> {
            let mut scripts = self.scripts.lock().unwrap();
            let queue = scripts.entry(layer).or_default();
            if queue.is_empty() {
                return Ok(Vec::new());
            }
            if queue.len() == 1 {
                Ok(queue[0].clone())
            } else {
                Ok(queue.remove(0))
            }
        }

        fn missing_id(&self, _layer: Layer, _ids: &[String]) -> Result<Option<String>, HnkError> {
            Ok(None)
        }

        fn section(&self, section_id: &str) -> Result<Option<SectionRecord>, HnkError> {
            Ok(self.sections.get(section_id).cloned())
        }
    }

    fn scored(id: &str, similarity: f32) -> ScoredCandidate {
        ScoredCandidate {
            id: id.to_string(),
            similarity,
            project_id: None,
            facets: CandidateFacets {
                label: id.to_string(),
                ..Default::default()
            },
        }
    }

    fn scored_typed(id: &str, similarity: f32, doc_type: &str) -> ScoredCandidate {
        let mut c = scored(id, similarity);
        c.facets.doc_type = Some(doc_type.to_string());
        c
    }

    fn section_fixture() -> SectionRecord {
        SectionRecord {
            section_id: "s1".to_string(),
            document_id: "d1".to_string(),
            project_id: "p1".to_string(),
            title: "Termination".to_string(),
            pages: PageRange { start: 12, end: 14 },
            excerpt: "Either party may terminate...".to_string(),
            embedding: None,
        }
    }

    fn config() -> NarrowingConfig {
        NarrowingConfig::default()
    }

    fn run(
        store: &ScriptedStore,
        state: &mut NarrowingState,
        message: &str,
    ) -> Result<TurnOutcome, HnkError> {
        let config = config();
        let orchestrator = Orchestrator::new(&config, &FixedEmbedder, store, &TemplatePhraser);
        orchestrator.run_turn(state, message)
    }

    #[test]
    fn test_happy_path_resolves_to_final() {
        let store = ScriptedStore::new(HashMap::from([
            (Layer::Project, vec![vec![scored("p1", 0.93), scored("p2", 0.60)]]),
            (Layer::Document, vec![vec![scored("d1", 0.88), scored("d2", 0.40)]]),
            (Layer::Section, vec![vec![scored("s1", 0.85), scored("s2", 0.31)]]),
        ]))
        .with_section(section_fixture());

        let mut state = NarrowingState::new("s");
        match run(&store, &mut state, "termination clause").unwrap() {
            TurnOutcome::Final {
                project_id,
                document_id,
                section_id,
                page_start,
                page_end,
                ..
            } => {
                assert_eq!(project_id, "p1");
                assert_eq!(document_id, "d1");
                assert_eq!(section_id, "s1");
                assert_eq!((page_start, page_end), (12, 14));
            }
            other => panic!("Expected Final, got {:?}", other),
        }
        assert_eq!(state.stage, Stage::Done);
    }

    #[test]
    fn test_monotonic_narrowing_locks() {
        // Scope strictly shrinks: 1 project, then 1 document, then done.
        let store = ScriptedStore::new(HashMap::from([
            (Layer::Project, vec![vec![scored("p1", 0.93)]]),
            (Layer::Document, vec![vec![scored("d1", 0.88)]]),
            (Layer::Section, vec![vec![scored("s1", 0.85)]]),
        ]))
        .with_section(section_fixture());

        let mut state = NarrowingState::new("s");
        run(&store, &mut state, "q").unwrap();
        assert_eq!(state.project_lock.as_ref().unwrap().len(), 1);
        assert_eq!(state.document_lock.as_deref(), Some("d1"));
    }

    #[test]
    fn test_ambiguous_project_asks_question_then_resumes() {
        let store = ScriptedStore::new(HashMap::from([
            (
                Layer::Project,
                vec![
                    // First pass: 0.91 vs 0.90 -> clarify.
                    vec![scored_typed("p1", 0.91, "contract"), scored_typed("p2", 0.90, "proposal")],
                    // After the answer: decisive.
                    vec![scored("p1", 0.95), scored("p2", 0.50)],
                ],
            ),
            (Layer::Document, vec![vec![scored("d1", 0.88)]]),
            (Layer::Section, vec![vec![scored("s1", 0.85)]]),
        ]))
        .with_section(section_fixture());

        let mut state = NarrowingState::new("s");
        match run(&store, &mut state, "the agreement").unwrap() {
            TurnOutcome::Question { layer, question, options } => {
                assert_eq!(layer, Layer::Project);
                assert!(question.contains("contract") && question.contains("proposal"));
                assert_eq!(options.len(), 2);
            }
            other => panic!("Expected Question, got {:?}", other),
        }
        assert!(matches!(
            state.stage,
            Stage::AwaitingClarification { return_layer: Layer::Project }
        ));

        // Answer resumes at the same layer with the refined query.
        match run(&store, &mut state, "the contract one").unwrap() {
            TurnOutcome::Final { project_id, .. } => assert_eq!(project_id, "p1"),
            other => panic!("Expected Final after answer, got {:?}", other),
        }
        assert_eq!(state.refinements, vec!["the contract one".to_string()]);
    }

    #[test]
    fn test_pair_merge_after_answered_clarification() {
        let store = ScriptedStore::new(HashMap::from([
            (
                Layer::Project,
                vec![
                    vec![scored("p1", 0.91), scored("p2", 0.90)],
                    // Still locked together after the answer: merged scope.
                    vec![scored("p1", 0.91), scored("p2", 0.905)],
                ],
            ),
            (Layer::Document, vec![vec![scored("d1", 0.88)]]),
            (Layer::Section, vec![vec![scored("s1", 0.85)]]),
        ]))
        .with_section(section_fixture());

        let mut state = NarrowingState::new("s");
        run(&store, &mut state, "q").unwrap();
        run(&store, &mut state, "both sound right").unwrap();
        assert_eq!(
            state.project_lock,
            Some(vec!["p1".to_string(), "p2".to_string()])
        );
    }

    #[test]
    fn test_clarification_exhausted_after_budget() {
        let ambiguous = vec![scored("p1", 0.91), scored("p2", 0.904)];
        // pair_margin is 0.02, so tolerate_pair would merge; keep a third
        // close candidate to force genuine ambiguity every pass.
        let three_way = vec![scored("p1", 0.91), scored("p2", 0.905), scored("p3", 0.90)];
        let store = ScriptedStore::new(HashMap::from([(
            Layer::Project,
            vec![ambiguous.clone(), three_way.clone(), three_way],
        )]));

        let mut state = NarrowingState::new("s");
        assert!(matches!(
            run(&store, &mut state, "q").unwrap(),
            TurnOutcome::Question { .. }
        ));
        assert!(matches!(
            run(&store, &mut state, "answer 1").unwrap(),
            TurnOutcome::Question { .. }
        ));
        match run(&store, &mut state, "answer 2") {
            Err(HnkError::ClarificationExhausted { layer, attempts, .. }) => {
                assert_eq!(layer, Layer::Project);
                assert_eq!(attempts, 2);
            }
            other => panic!("Expected ClarificationExhausted, got {:?}", other.map(|_| ())),
        }
        assert_eq!(state.stage, Stage::Done);
    }

    #[test]
    fn test_empty_project_reports_no_match() {
        let store = ScriptedStore::new(HashMap::from([(
            Layer::Project,
            vec![vec![scored("p1", 0.10)]],
        )]));

        let mut state = NarrowingState::new("s");
        match run(&store, &mut state, "gibberish").unwrap() {
            TurnOutcome::NoMatch { layer, project_ids, .. } => {
                assert_eq!(layer, Layer::Project);
                assert!(project_ids.is_none());
            }
            other => panic!("Expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_section_degrades_to_partial() {
        let store = ScriptedStore::new(HashMap::from([
            (Layer::Project, vec![vec![scored("p1", 0.93)]]),
            (Layer::Document, vec![vec![scored("d1", 0.88)]]),
            (Layer::Section, vec![vec![scored("s1", 0.05)]]),
        ]));

        let mut state = NarrowingState::new("s");
        match run(&store, &mut state, "q").unwrap() {
            TurnOutcome::Partial {
                project_ids,
                document_id,
                status,
            } => {
                assert_eq!(project_ids, vec!["p1".to_string()]);
                assert_eq!(document_id, "d1");
                assert_eq!(status, "no matching section");
            }
            other => panic!("Expected Partial, got {:?}", other),
        }
    }

    #[test]
    fn test_section_failure_preserves_upper_locks() {
        // The Section layer errors (resolved section missing from catalog);
        // the project/document locks must survive for a retry.
        let store = ScriptedStore::new(HashMap::from([
            (Layer::Project, vec![vec![scored("p1", 0.93)]]),
            (Layer::Document, vec![vec![scored("d1", 0.88)]]),
            (Layer::Section, vec![vec![scored("ghost", 0.85)]]),
        ]));

        let mut state = NarrowingState::new("s");
        assert!(run(&store, &mut state, "q").is_err());
        assert_eq!(state.project_lock, Some(vec!["p1".to_string()]));
        assert_eq!(state.document_lock.as_deref(), Some("d1"));
    }

    #[test]
    fn test_termination_bound() {
        // Perpetually ambiguous three-way tie at every layer: the episode
        // must end within max_attempts x 3 turns.
        let tie = vec![scored("a", 0.91), scored("b", 0.905), scored("c", 0.90)];
        let store = ScriptedStore::new(HashMap::from([(Layer::Project, vec![tie])]));

        let mut state = NarrowingState::new("s");
        let max_turns = config().max_attempts_per_layer as usize * 3;
        let mut finished = false;
        let mut message = "q".to_string();
        for turn in 0..=max_turns {
            match run(&store, &mut state, &message) {
                Ok(TurnOutcome::Question { .. }) => {
                    message = format!("answer {}", turn);
                }
                Ok(_) | Err(HnkError::ClarificationExhausted { .. }) => {
                    finished = true;
                    break;
                }
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert!(finished, "episode did not terminate within the bound");
    }

    #[test]
    fn test_new_episode_keeps_project_lock() {
        let store = ScriptedStore::new(HashMap::from([
            (Layer::Project, vec![vec![scored("p1", 0.93)]]),
            (Layer::Document, vec![vec![scored("d1", 0.88)]]),
            (Layer::Section, vec![vec![scored("s1", 0.85)]]),
        ]))
        .with_section(section_fixture());

        let mut state = NarrowingState::new("s");
        run(&store, &mut state, "first question").unwrap();
        assert_eq!(state.stage, Stage::Done);

        // Next episode starts at the document layer under the same lock.
        run(&store, &mut state, "second question").unwrap();
        assert_eq!(state.project_lock, Some(vec!["p1".to_string()]));
    }
}
