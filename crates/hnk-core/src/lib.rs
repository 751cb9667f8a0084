//! # hnk-core
//!
//! **Hierarchical Narrowing Kernel** - core engine library.
//!
//! HNK answers underspecified natural-language questions over a corpus
//! organized as projects -> documents -> sections. Three cascaded retrieval
//! layers narrow the scope step by step; at each layer an ambiguity scorer
//! decides whether confidence is good enough to continue or whether the
//! turn must pause and ask exactly one clarifying question. Scoping is
//! strict: once a project is locked, no deeper layer can surface content
//! from another project.
//!
//! ## Main Types
//!
//! - [`HnkEngine`] - the main entry point for all operations
//! - [`Workspace`] - a resolved corpus workspace on disk
//! - [`HnkError`] - domain-specific error type
//! - [`TurnOutcome`] - what one processed turn hands back to the transport
//!
//! ## Modules
//!
//! - [`scorer`] - the CONTINUE vs CLARIFY vs EMPTY decision rule
//! - [`layer`] - the shared layer engine (instantiated per layer)
//! - [`orchestrator`] - the state machine over the three layers
//! - [`clarify`] - clarifying question generation
//! - [`session`] - durable per-session narrowing state
//! - [`descriptor`] - descriptor records consumed from ingestion
//! - [`config`] - configuration types
//!
//! ## Example
//!
//! ```ignore
//! use hnk_core::{HnkEngine, Workspace};
//! use std::path::Path;
//!
//! let engine = HnkEngine::with_defaults()?;
//! let mut workspace = engine.resolve_workspace(Path::new("."))?;
//! engine.init_workspace(&mut workspace)?;
//! engine.load_corpus(&workspace, Path::new("descriptors"), None)?;
//!
//! let reply = engine.handle_turn(&workspace, "session-1", "where is the Q3 budget summary?")?;
//! println!("{:?}", reply.outcome);
//! ```

// Modules
pub mod clarify;
pub mod config;
pub mod constants;
pub mod descriptor;
pub mod embed_adapter;
pub mod engine;
pub mod errors;
pub mod layer;
pub mod orchestrator;
pub mod scorer;
pub mod session;
pub mod store_adapter;
pub mod types;
pub mod workspace;

// Re-exports for convenience
pub use clarify::{
    generate_question, ClarifyOption, ClarifyingQuestion, QuestionPhraser, TemplatePhraser,
};
pub use config::{GlobalConfig, NarrowingConfig, DEFAULT_MAX_ATTEMPTS_PER_LAYER};
pub use constants::{
    CORPUS_DIR, GLOBAL_CONFIG_FILENAME, HNK_HOME_DIR, INGEST_DOCUMENTS_FILENAME,
    INGEST_PROJECTS_FILENAME, INGEST_SECTIONS_FILENAME, SESSIONS_DIR, WORKSPACE_DIR,
};
pub use descriptor::{
    facets_from_attributes, DocumentDescriptor, PageRange, ProjectProfile, SectionRecord,
};
pub use engine::{HnkEngine, LoadReport, StatusReport, TurnReply};
pub use errors::HnkError;
pub use layer::LayerEngine;
pub use orchestrator::{Orchestrator, TurnOutcome};
pub use scorer::{
    decide, select_dimension, Decision, DiscriminatingDimension, LayerThresholds,
    DEFAULT_DECISIVE_GAP, DEFAULT_MIN_SIM, DEFAULT_PAIR_MARGIN, DEFAULT_SECTION_DECISIVE_GAP,
    DEFAULT_TOP_K,
};
pub use session::{
    parse_command, validate_session_id, LayerAttempts, NarrowingState, PendingClarification,
    SessionCommand, SessionStore, Stage, TurnLogEntry,
};
pub use types::{CandidateFacets, Layer, ProfileSearch, QueryEmbedder, Scope, ScoredCandidate};
pub use workspace::Workspace;

// hnk-store adapter - bridges the storage layer (catalog, scoped search)
pub use store_adapter::{from_store_error, CatalogSearch};

// hnk-embed adapter - bridges the embedding provider boundary
pub use embed_adapter::{from_embed_error, BackendEmbedder};
