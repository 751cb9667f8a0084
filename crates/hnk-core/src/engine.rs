//! HNK Engine - the entry point for all narrowing operations.
//!
//! The [`HnkEngine`] wires configuration, the embedding backend, the
//! descriptor catalog, and per-session state together. It is the surface
//! the CLI (or any other transport) talks to: one call per user turn, one
//! outcome back.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clarify::TemplatePhraser;
use crate::config::GlobalConfig;
use crate::constants::{
    INGEST_DOCUMENTS_FILENAME, INGEST_PROJECTS_FILENAME, INGEST_SECTIONS_FILENAME,
};
use crate::descriptor::{DocumentDescriptor, ProjectProfile, SectionRecord};
use crate::embed_adapter::BackendEmbedder;
use crate::errors::HnkError;
use crate::orchestrator::{Orchestrator, TurnOutcome};
use crate::session::{
    parse_command, NarrowingState, SessionCommand, SessionStore, TurnLogEntry,
};
use crate::store_adapter::{from_store_error, CatalogSearch};
use crate::types::{Layer, ProfileSearch};
use crate::workspace::Workspace;
use hnk_embed::create_embedding_backend;
use hnk_store::{
    check_catalog_compatibility, load_catalog_meta, CatalogCompatibility, CatalogMeta,
    DescriptorRecord, ProfileCatalog, RecordLayer, META_FILENAME,
};

// ============================================================================
// Reports
// ============================================================================

/// Result of loading a descriptor corpus into the workspace.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Corpus version recorded in the catalog metadata.
    pub corpus_version: String,

    /// Number of project profiles loaded.
    pub projects: usize,

    /// Number of document descriptors loaded.
    pub documents: usize,

    /// Number of section records loaded.
    pub sections: usize,

    /// How many records were embedded at load time (had no precomputed
    /// vector).
    pub embedded: usize,
}

/// Result of one processed user turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    /// The session the turn belongs to.
    pub session_id: String,

    /// Unique id of this turn.
    pub turn_id: Uuid,

    /// The turn outcome.
    pub outcome: TurnOutcome,
}

/// Workspace status summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Workspace root path.
    pub workspace_root: std::path::PathBuf,

    /// Whether `.hnk` exists.
    pub initialized: bool,

    /// Catalog metadata, when a corpus has been loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<CatalogMeta>,

    /// Known session ids.
    pub sessions: Vec<String>,
}

// ============================================================================
// HnkEngine
// ============================================================================

/// The main engine for HNK operations.
///
/// # Construction
///
/// Use [`HnkEngine::with_defaults`] for typical usage or
/// [`HnkEngine::with_config`] to point at a specific config file.
///
/// # Concurrency
///
/// Turns of the same session are serialized through a per-session mutex;
/// different sessions proceed in parallel over the read-only catalog.
pub struct HnkEngine {
    config: GlobalConfig,
    embedder: BackendEmbedder,
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for HnkEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HnkEngine")
            .field("model_id", &self.embedder.backend().model_id())
            .finish()
    }
}

impl HnkEngine {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create an engine from a global configuration.
    pub fn from_global_config(config: GlobalConfig) -> anyhow::Result<Self> {
        let backend = create_embedding_backend(&config.embedding)?;
        Ok(Self {
            config,
            embedder: BackendEmbedder::new(backend),
            session_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Create an engine with configuration from the default location.
    pub fn with_defaults() -> anyhow::Result<Self> {
        let config = GlobalConfig::load_default()?;
        Self::from_global_config(config)
    }

    /// Create an engine with configuration from a specific path.
    pub fn with_config(path: &Path) -> anyhow::Result<Self> {
        let config = GlobalConfig::from_path(path)?;
        Self::from_global_config(config)
    }

    /// The active configuration.
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Workspace
    // -------------------------------------------------------------------------

    /// Resolve a workspace by walking up from `start`.
    pub fn resolve_workspace(&self, start: &Path) -> Result<Workspace, HnkError> {
        Workspace::resolve(start)
    }

    /// Initialize workspace structures. Returns `false` when already
    /// initialized.
    pub fn init_workspace(&self, workspace: &mut Workspace) -> Result<bool, HnkError> {
        let created = workspace.init()?;
        if created {
            info!("Initialized HNK workspace at {}", workspace.root().display());
        }
        Ok(created)
    }

    // -------------------------------------------------------------------------
    // Corpus loading
    // -------------------------------------------------------------------------

    /// Load finished descriptor records into the workspace catalog.
    ///
    /// `source_dir` must contain `projects.jsonl` and may contain
    /// `documents.jsonl` and `sections.jsonl`. Records without a
    /// precomputed embedding are embedded through the active backend; all
    /// records are validated before anything is written.
    pub fn load_corpus(
        &self,
        workspace: &Workspace,
        source_dir: &Path,
        corpus_version: Option<String>,
    ) -> Result<LoadReport, HnkError> {
        if !workspace.is_initialized() {
            return Err(HnkError::NotInitialized);
        }

        let projects: Vec<ProjectProfile> =
            read_jsonl(&source_dir.join(INGEST_PROJECTS_FILENAME))?;
        let documents: Vec<DocumentDescriptor> =
            read_jsonl(&source_dir.join(INGEST_DOCUMENTS_FILENAME))?;
        let sections: Vec<SectionRecord> =
            read_jsonl(&source_dir.join(INGEST_SECTIONS_FILENAME))?;

        if projects.is_empty() {
            return Err(HnkError::InvalidArgument(format!(
                "No project profiles found in {}",
                source_dir.join(INGEST_PROJECTS_FILENAME).display()
            )));
        }

        for project in &projects {
            project.validate()?;
        }
        for document in &documents {
            document.validate()?;
        }
        for section in &sections {
            section.validate()?;
        }

        let version = corpus_version.unwrap_or_else(|| Uuid::new_v4().to_string());
        let info = self.embedder.backend().model_info().clone();
        let mut catalog = ProfileCatalog::create(
            workspace.corpus_root(),
            CatalogMeta::new(&info.provider, &info.model_id, info.dimension, &version),
        );

        let mut embedded = 0usize;
        let project_records = self.to_records(
            projects.iter().map(|p| (p.embedding.clone(), p.embedding_text(), p)),
            |p, v| p.to_record(v),
            &mut embedded,
        )?;
        let document_records = self.to_records(
            documents.iter().map(|d| (d.embedding.clone(), d.embedding_text(), d)),
            |d, v| d.to_record(v),
            &mut embedded,
        )?;
        let section_records = self.to_records(
            sections.iter().map(|s| (s.embedding.clone(), s.embedding_text(), s)),
            |s, v| s.to_record(v),
            &mut embedded,
        )?;

        catalog
            .replace_layer(RecordLayer::Project, project_records)
            .map_err(from_store_error)?;
        catalog
            .replace_layer(RecordLayer::Document, document_records)
            .map_err(from_store_error)?;
        catalog
            .replace_layer(RecordLayer::Section, section_records)
            .map_err(from_store_error)?;
        catalog.save().map_err(from_store_error)?;

        info!(
            projects = projects.len(),
            documents = documents.len(),
            sections = sections.len(),
            embedded,
            "Loaded descriptor corpus (version {})",
            version
        );

        Ok(LoadReport {
            corpus_version: version,
            projects: projects.len(),
            documents: documents.len(),
            sections: sections.len(),
            embedded,
        })
    }

    /// Convert descriptors to stored records, embedding the ones that
    /// arrived without a vector.
    fn to_records<'a, T: 'a>(
        &self,
        items: impl Iterator<Item = (Option<Vec<f32>>, String, &'a T)>,
        to_record: impl Fn(&T, Vec<f32>) -> DescriptorRecord,
        embedded: &mut usize,
    ) -> Result<Vec<DescriptorRecord>, HnkError> {
        let mut pending_texts: Vec<String> = Vec::new();
        let mut staged: Vec<(Option<Vec<f32>>, &T)> = Vec::new();

        for (vector, text, item) in items {
            if vector.is_none() {
                pending_texts.push(text);
            }
            staged.push((vector, item));
        }

        let mut computed = if pending_texts.is_empty() {
            Vec::new()
        } else {
            let refs: Vec<&str> = pending_texts.iter().map(|s| s.as_str()).collect();
            *embedded += refs.len();
            self.embedder.embed_batch(&refs)?
        }
        .into_iter();

        staged
            .into_iter()
            .map(|(vector, item)| {
                let vector = match vector {
                    Some(v) => v,
                    None => computed.next().ok_or_else(|| {
                        HnkError::Other(anyhow::anyhow!("embedding batch came back short"))
                    })?,
                };
                Ok(to_record(item, vector))
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Catalog access
    // -------------------------------------------------------------------------

    /// Open the workspace catalog, checking embedding compatibility.
    pub fn open_search(&self, workspace: &Workspace) -> Result<CatalogSearch, HnkError> {
        if !workspace.is_initialized() {
            return Err(HnkError::NotInitialized);
        }
        let catalog = ProfileCatalog::open(workspace.corpus_root()).map_err(from_store_error)?;

        let backend = self.embedder.backend();
        match check_catalog_compatibility(
            Some(catalog.meta()),
            backend.model_id(),
            backend.dimension(),
        ) {
            CatalogCompatibility::Compatible => Ok(CatalogSearch::new(catalog)),
            CatalogCompatibility::MissingMeta => Err(HnkError::CorpusNotLoaded),
            CatalogCompatibility::ModelMismatch {
                active_model,
                catalog_model,
            } => Err(HnkError::CatalogIncompatible {
                reason: format!(
                    "catalog was embedded with `{}`, active backend is `{}`",
                    catalog_model, active_model
                ),
            }),
            CatalogCompatibility::DimensionMismatch { active, catalog } => {
                Err(HnkError::CatalogIncompatible {
                    reason: format!(
                        "catalog dimension {} does not match backend dimension {}",
                        catalog, active
                    ),
                })
            }
        }
    }

    // -------------------------------------------------------------------------
    // Turns
    // -------------------------------------------------------------------------

    /// Process one user turn for a session.
    ///
    /// Handles inline commands (`/clear`, `/lock`, `/unlock`) locally, runs
    /// the narrowing orchestrator otherwise, and persists session state in
    /// both cases — a failing turn keeps its resolved locks.
    pub fn handle_turn(
        &self,
        workspace: &Workspace,
        session_id: &str,
        message: &str,
    ) -> Result<TurnReply, HnkError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(HnkError::InvalidArgument(
                "Message cannot be empty".to_string(),
            ));
        }

        let guard = self.session_guard(session_id);
        let _turn = guard.lock().expect("session guard poisoned");
        let sessions = SessionStore::new(workspace.sessions_root());
        let turn_id = Uuid::new_v4();

        if let Some(command) = parse_command(message)? {
            let outcome = self.apply_command(workspace, &sessions, session_id, command)?;
            return Ok(TurnReply {
                session_id: session_id.to_string(),
                turn_id,
                outcome,
            });
        }

        let search = self.open_search(workspace)?;
        let mut state = sessions.load_or_create(session_id)?;

        let orchestrator = Orchestrator::new(
            &self.config.narrowing,
            &self.embedder,
            &search,
            &TemplatePhraser,
        );
        let result = orchestrator.run_turn(&mut state, message);

        // Persist state on success and failure alike; retrieval errors are
        // layer-local and must not discard resolved locks.
        sessions.save(&state)?;
        let outcome = result?;

        sessions.append_turn(
            session_id,
            &TurnLogEntry {
                turn_id,
                timestamp: Utc::now(),
                input: message.to_string(),
                outcome: outcome.kind().to_string(),
                stage: format!("{:?}", state.stage),
            },
        )?;

        debug!(session = session_id, outcome = outcome.kind(), "Turn complete");
        Ok(TurnReply {
            session_id: session_id.to_string(),
            turn_id,
            outcome,
        })
    }

    fn apply_command(
        &self,
        workspace: &Workspace,
        sessions: &SessionStore,
        session_id: &str,
        command: SessionCommand,
    ) -> Result<TurnOutcome, HnkError> {
        match command {
            SessionCommand::Clear => {
                sessions.clear(session_id)?;
                Ok(TurnOutcome::Notice {
                    message: "Session cleared.".to_string(),
                })
            }
            SessionCommand::Unlock => {
                let mut state = sessions.load_or_create(session_id)?;
                // Unlock without a lock is recovered locally as a no-op.
                let released = state.unlock();
                sessions.save(&state)?;
                Ok(TurnOutcome::Notice {
                    message: if released {
                        "Locks released.".to_string()
                    } else {
                        "No lock to release.".to_string()
                    },
                })
            }
            SessionCommand::Lock(project_id) => {
                let search = self.open_search(workspace)?;
                if search
                    .missing_id(Layer::Project, std::slice::from_ref(&project_id))?
                    .is_some()
                {
                    return Err(HnkError::ScopeNotFound {
                        layer: Layer::Project,
                        scope_id: project_id,
                    });
                }
                let mut state = sessions.load_or_create(session_id)?;
                state.lock_project(&project_id);
                sessions.save(&state)?;
                Ok(TurnOutcome::Notice {
                    message: format!("Session locked to project `{}`.", project_id),
                })
            }
        }
    }

    /// Per-session serialization guard.
    fn session_guard(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().expect("session lock map poisoned");
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // -------------------------------------------------------------------------
    // Status
    // -------------------------------------------------------------------------

    /// Summarize workspace state.
    pub fn status(&self, workspace: &Workspace) -> Result<StatusReport, HnkError> {
        let catalog = if workspace.is_initialized() {
            load_catalog_meta(&workspace.corpus_root().join(META_FILENAME))
                .map_err(from_store_error)?
        } else {
            None
        };

        let sessions = if workspace.is_initialized() {
            SessionStore::new(workspace.sessions_root()).list()?
        } else {
            Vec::new()
        };

        Ok(StatusReport {
            workspace_root: workspace.root().to_path_buf(),
            initialized: workspace.is_initialized(),
            catalog,
            sessions,
        })
    }

    /// Fetch a session's durable state, if any.
    pub fn session_state(
        &self,
        workspace: &Workspace,
        session_id: &str,
    ) -> Result<Option<NarrowingState>, HnkError> {
        SessionStore::new(workspace.sessions_root()).load(session_id)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Read a JSONL file of descriptor records; a missing file is an empty list.
fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, HnkError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut items = Vec::new();
    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }
        let item: T = serde_json::from_str(&line).map_err(|e| HnkError::CatalogParse {
            path: path.to_path_buf(),
            message: format!("line {}: {}", line_num + 1, e),
        })?;
        items.push(item);
    }
    Ok(items)
}

// ============================================================================
// Tests
// ============================================================================
