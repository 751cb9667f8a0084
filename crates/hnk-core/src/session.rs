//! Session state and inline command handling.
//!
//! A clarification round-trip may resume arbitrarily later, so narrowing
//! state is durable: each turn is a pure transition over
//! `(stored state, input)` with the state persisted as JSON keyed by
//! session id. No suspended call stacks, no long-lived locks.
//!
//! ## On-Disk Format
//!
//! Session data lives under `.hnk/sessions/`:
//! - `<session-id>.json` - the [`NarrowingState`] (JSON)
//! - `<session-id>.turns.jsonl` - one [`TurnLogEntry`] per turn (JSONL)

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::TURN_LOG_SUFFIX;
use crate::errors::HnkError;
use crate::scorer::DiscriminatingDimension;
use crate::types::Layer;

// ============================================================================
// Stage
// ============================================================================

/// Orchestrator state machine stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Stage {
    /// Narrowing at the Project layer.
    AtProject,
    /// Narrowing at the Document layer.
    AtDocument,
    /// Narrowing at the Section layer.
    AtSection,
    /// Suspended on an outstanding clarifying question.
    AwaitingClarification {
        /// The layer to resume at when the answer arrives.
        return_layer: Layer,
    },
    /// The last episode finished (result, partial, or no match).
    Done,
}

impl Stage {
    /// The layer a narrowing stage operates on, if any.
    pub fn layer(&self) -> Option<Layer> {
        match self {
            Self::AtProject => Some(Layer::Project),
            Self::AtDocument => Some(Layer::Document),
            Self::AtSection => Some(Layer::Section),
            Self::AwaitingClarification { return_layer } => Some(*return_layer),
            Self::Done => None,
        }
    }
}

// ============================================================================
// PendingClarification
// ============================================================================

/// The outstanding clarifying question of a suspended episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingClarification {
    /// The ambiguous layer.
    pub layer: Layer,

    /// The dimension the question splits on.
    pub dimension: DiscriminatingDimension,

    /// Candidate ids the question was derived from.
    pub candidate_ids: Vec<String>,

    /// The question text shown to the user.
    pub question: String,

    /// When the question was asked.
    pub asked_at: DateTime<Utc>,
}

// ============================================================================
// LayerAttempts
// ============================================================================

/// Per-layer clarification attempt counters for the current episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerAttempts {
    pub project: u8,
    pub document: u8,
    pub section: u8,
}

impl LayerAttempts {
    /// Attempts spent at a layer.
    pub fn get(&self, layer: Layer) -> u8 {
        match layer {
            Layer::Project => self.project,
            Layer::Document => self.document,
            Layer::Section => self.section,
        }
    }

    /// Record one more attempt at a layer.
    pub fn bump(&mut self, layer: Layer) {
        match layer {
            Layer::Project => self.project += 1,
            Layer::Document => self.document += 1,
            Layer::Section => self.section += 1,
        }
    }
}

// ============================================================================
// NarrowingState
// ============================================================================

/// Durable per-session narrowing state.
///
/// Invariant: once a layer is resolved (locked), deeper refinement turns
/// never re-open a shallower lock implicitly; only an explicit `/unlock`
/// may. The project lock survives across episodes; document resolution
/// belongs to a single episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrowingState {
    /// The owning session id.
    pub session_id: String,

    /// Current state machine stage.
    pub stage: Stage,

    /// Resolved project scope (singleton, or a merged pair).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_lock: Option<Vec<String>>,

    /// Resolved document within the current episode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_lock: Option<String>,

    /// Outstanding clarifying question, if suspended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingClarification>,

    /// The episode's original query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_query: Option<String>,

    /// Clarification answers accumulated this episode, in order.
    #[serde(default)]
    pub refinements: Vec<String>,

    /// Clarification attempts spent this episode.
    #[serde(default)]
    pub attempts: LayerAttempts,

    /// When the session was created.
    pub created_at: DateTime<Utc>,

    /// When the state last changed.
    pub updated_at: DateTime<Utc>,
}

impl NarrowingState {
    /// Fresh state for a new session.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            stage: Stage::AtProject,
            project_lock: None,
            document_lock: None,
            pending: None,
            original_query: None,
            refinements: Vec::new(),
            attempts: LayerAttempts::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Begin a new narrowing episode for a fresh query.
    ///
    /// The project lock survives; everything episode-scoped resets.
    pub fn begin_episode(&mut self, query: impl Into<String>) {
        self.original_query = Some(query.into());
        self.refinements.clear();
        self.document_lock = None;
        self.pending = None;
        self.attempts = LayerAttempts::default();
        self.stage = if self.project_lock.is_some() {
            Stage::AtDocument
        } else {
            Stage::AtProject
        };
        self.touch();
    }

    /// The refined query: original plus accumulated clarification answers.
    pub fn refined_query(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(1 + self.refinements.len());
        if let Some(q) = &self.original_query {
            parts.push(q);
        }
        parts.extend(self.refinements.iter().map(|s| s.as_str()));
        parts.join(" ")
    }

    /// Lock the session to an explicit project id.
    pub fn lock_project(&mut self, project_id: impl Into<String>) {
        self.project_lock = Some(vec![project_id.into()]);
        self.document_lock = None;
        self.pending = None;
        self.stage = Stage::Done;
        self.touch();
    }

    /// Explicitly release all locks.
    ///
    /// Returns `false` when there was nothing to unlock.
    pub fn unlock(&mut self) -> bool {
        if self.project_lock.is_none() && self.document_lock.is_none() {
            return false;
        }
        self.project_lock = None;
        self.document_lock = None;
        self.pending = None;
        self.stage = Stage::Done;
        self.touch();
        true
    }

    /// Refresh the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Inline commands
// ============================================================================

/// An inline session command recognized in a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// `/clear` - destroy session state.
    Clear,
    /// `/lock <project-id>` - explicitly lock the session to a project.
    Lock(String),
    /// `/unlock` - explicitly release locks.
    Unlock,
}

/// Parse an inline slash command from a message.
///
/// Returns `Ok(None)` for ordinary messages, and
/// [`HnkError::UnknownCommand`] for a slash command that is not recognized.
pub fn parse_command(message: &str) -> Result<Option<SessionCommand>, HnkError> {
    // Not worth caching: one compile per turn.
    let pattern = Regex::new(r"^/(\w+)(?:\s+(\S+))?\s*$").expect("static pattern");
    let trimmed = message.trim();
    if !trimmed.starts_with('/') {
        return Ok(None);
    }

    let caps = pattern
        .captures(trimmed)
        .ok_or_else(|| HnkError::UnknownCommand(trimmed.trim_start_matches('/').to_string()))?;

    let command = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
    let argument = caps.get(2).map(|m| m.as_str().to_string());

    match (command.as_str(), argument) {
        ("clear", None) => Ok(Some(SessionCommand::Clear)),
        ("unlock", None) => Ok(Some(SessionCommand::Unlock)),
        ("lock", Some(project_id)) => Ok(Some(SessionCommand::Lock(project_id))),
        ("lock", None) => Err(HnkError::InvalidArgument(
            "Usage: /lock <project-id>".to_string(),
        )),
        (other, _) => Err(HnkError::UnknownCommand(other.to_string())),
    }
}

// ============================================================================
// TurnLogEntry
// ============================================================================

/// One line of the per-session turn log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnLogEntry {
    /// Unique id of this turn.
    pub turn_id: Uuid,

    /// When the turn was processed.
    pub timestamp: DateTime<Utc>,

    /// The raw user message.
    pub input: String,

    /// Outcome discriminant ("question", "final", "partial", ...).
    pub outcome: String,

    /// Stage after the turn.
    pub stage: String,
}

// ============================================================================
// SessionStore
// ============================================================================

/// Durable session registry backed by per-session JSON files.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at the sessions directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The sessions directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load a session's state, if present.
    pub fn load(&self, session_id: &str) -> Result<Option<NarrowingState>, HnkError> {
        let path = self.state_path(session_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| HnkError::SessionIo {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let state = serde_json::from_str(&content).map_err(|e| HnkError::SessionParse {
            path,
            message: e.to_string(),
        })?;
        Ok(Some(state))
    }

    /// Load a session's state, creating fresh state when absent.
    pub fn load_or_create(&self, session_id: &str) -> Result<NarrowingState, HnkError> {
        Ok(self
            .load(session_id)?
            .unwrap_or_else(|| NarrowingState::new(session_id)))
    }

    /// Persist a session's state.
    pub fn save(&self, state: &NarrowingState) -> Result<(), HnkError> {
        let path = self.state_path(&state.session_id)?;
        fs::create_dir_all(&self.root).map_err(|e| HnkError::SessionIo {
            path: self.root.clone(),
            message: e.to_string(),
        })?;

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).map_err(|e| HnkError::SessionIo {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Destroy a session's state and turn log.
    pub fn clear(&self, session_id: &str) -> Result<(), HnkError> {
        for path in [self.state_path(session_id)?, self.log_path(session_id)?] {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| HnkError::SessionIo {
                    path,
                    message: e.to_string(),
                })?;
            }
        }
        Ok(())
    }

    /// List known session ids.
    pub fn list(&self) -> Result<Vec<String>, HnkError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(|e| HnkError::SessionIo {
            path: self.root.clone(),
            message: e.to_string(),
        })? {
            let entry = entry.map_err(|e| HnkError::SessionIo {
                path: self.root.clone(),
                message: e.to_string(),
            })?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(id) = name.strip_suffix(".json") {
                if !id.ends_with(".turns") {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Append one entry to the session's turn log.
    pub fn append_turn(&self, session_id: &str, entry: &TurnLogEntry) -> Result<(), HnkError> {
        let path = self.log_path(session_id)?;
        fs::create_dir_all(&self.root).map_err(|e| HnkError::SessionIo {
            path: self.root.clone(),
            message: e.to_string(),
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| HnkError::SessionIo {
                path: path.clone(),
                message: e.to_string(),
            })?;
        let line = serde_json::to_string(entry)?;
        writeln!(file, "{}", line).map_err(|e| HnkError::SessionIo {
            path,
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Read the session's turn log.
    pub fn read_turns(&self, session_id: &str) -> Result<Vec<TurnLogEntry>, HnkError> {
        let path = self.log_path(session_id)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).map_err(|e| HnkError::SessionIo {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let reader = std::io::BufReader::new(file);
        let mut entries = Vec::new();
        for line in std::io::BufRead::lines(reader) {
            let line = line.map_err(|e| HnkError::SessionIo {
                path: path.clone(),
                message: e.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|e| HnkError::SessionParse {
                path: path.clone(),
                message: e.to_string(),
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn state_path(&self, session_id: &str) -> Result<PathBuf, HnkError> {
        validate_session_id(session_id)?;
        Ok(self.root.join(format!("{}.json", session_id)))
    }

    fn log_path(&self, session_id: &str) -> Result<PathBuf, HnkError> {
        validate_session_id(session_id)?;
        Ok(self.root.join(format!("{}{}", session_id, TURN_LOG_SUFFIX)))
    }
}

/// Session ids double as filenames, so the charset is restricted.
pub fn validate_session_id(session_id: &str) -> Result<(), HnkError> {
    let valid = !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        && !session_id.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(HnkError::InvalidSessionId(session_id.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
