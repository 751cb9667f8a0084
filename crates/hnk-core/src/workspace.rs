//! Workspace detection and management.
//!
//! A workspace is a corpus directory that holds (or will hold) a `.hnk`
//! directory with the descriptor catalog and session state.

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{CORPUS_DIR, SESSIONS_DIR, WORKSPACE_DIR};
use crate::errors::HnkError;

// ============================================================================
// Helper Functions
// ============================================================================

/// Check if a path is a disk root (e.g., C:\ on Windows, / on Unix).
///
/// Prevents creating workspaces in locations that would shadow the whole
/// filesystem.
fn is_disk_root(path: &Path) -> bool {
    if path.parent().is_some() {
        return false;
    }

    #[cfg(windows)]
    {
        if let Some(s) = path.to_str() {
            if s.len() >= 2 && s.chars().nth(1) == Some(':') {
                return true;
            }
        }
    }

    #[cfg(not(windows))]
    {
        if path == Path::new("/") {
            return true;
        }
    }

    path.canonicalize()
        .ok()
        .map_or(false, |p| p.parent().is_none())
}

// ============================================================================
// Workspace
// ============================================================================

/// A resolved HNK workspace.
///
/// # Example
///
/// ```ignore
/// use hnk_core::Workspace;
/// use std::path::Path;
///
/// let workspace = Workspace::resolve(Path::new("."))?;
/// println!("Catalog root: {:?}", workspace.corpus_root());
/// ```
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Absolute path to the workspace root directory.
    root: PathBuf,

    /// Path to the `.hnk` directory.
    hnk_root: PathBuf,

    /// Whether the workspace has been initialized (`.hnk` exists).
    initialized: bool,
}

impl Workspace {
    /// Create a `Workspace` from a root directory path.
    ///
    /// # Errors
    ///
    /// Returns [`HnkError::PathNotFound`] if the path does not exist or is
    /// not a directory, and [`HnkError::InvalidPath`] at a disk root.
    pub fn from_root(root: &Path) -> Result<Self, HnkError> {
        let root = root
            .canonicalize()
            .map_err(|_| HnkError::PathNotFound(root.display().to_string()))?;

        if !root.is_dir() {
            return Err(HnkError::PathNotFound(root.display().to_string()));
        }

        if is_disk_root(&root) {
            return Err(HnkError::InvalidPath(format!(
                "Cannot create an HNK workspace at disk root: {}. \
                 Use a corpus directory instead.",
                root.display()
            )));
        }

        let hnk_root = root.join(WORKSPACE_DIR);
        let initialized = hnk_root.is_dir();

        Ok(Self {
            root,
            hnk_root,
            initialized,
        })
    }

    /// Resolve a workspace by walking up from the given directory.
    ///
    /// Returns the first ancestor containing a `.hnk` directory, or a
    /// workspace at `start` itself when none is found (so `init` has a
    /// target).
    pub fn resolve(start: &Path) -> Result<Self, HnkError> {
        let start = start
            .canonicalize()
            .map_err(|_| HnkError::PathNotFound(start.display().to_string()))?;

        let mut current = Some(start.as_path());
        while let Some(dir) = current {
            if dir.join(WORKSPACE_DIR).is_dir() {
                return Self::from_root(dir);
            }
            current = dir.parent();
        }

        Self::from_root(&start)
    }

    /// Initialize the workspace directory structure.
    ///
    /// Idempotent: re-running on an initialized workspace is a no-op that
    /// reports `false`.
    pub fn init(&mut self) -> Result<bool, HnkError> {
        if self.initialized {
            return Ok(false);
        }
        fs::create_dir_all(self.corpus_root())?;
        fs::create_dir_all(self.sessions_root())?;
        self.initialized = true;
        Ok(true)
    }

    /// Absolute workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.hnk` directory.
    pub fn hnk_root(&self) -> &Path {
        &self.hnk_root
    }

    /// The descriptor catalog directory (`.hnk/corpus`).
    pub fn corpus_root(&self) -> PathBuf {
        self.hnk_root.join(CORPUS_DIR)
    }

    /// The session state directory (`.hnk/sessions`).
    pub fn sessions_root(&self) -> PathBuf {
        self.hnk_root.join(SESSIONS_DIR)
    }

    /// Whether `.hnk` exists.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

// ============================================================================
// Tests
// ============================================================================
