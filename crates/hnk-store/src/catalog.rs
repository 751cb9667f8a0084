//! Descriptor catalog persistence and scoped search.
//!
//! ## On-Disk Format
//!
//! A catalog lives in a single directory:
//! - `meta.json` - [`CatalogMeta`] (embedding model, dimension, counts)
//! - `projects.jsonl` - one [`DescriptorRecord`] per line
//! - `documents.jsonl` - one record per line, `parent_id` = owning project
//! - `sections.jsonl` - one record per line, `parent_id` = owning document
//!
//! Records carry an opaque JSON attribute payload; the narrowing kernel
//! owns the domain shape of those attributes. The catalog enforces what it
//! can see: unique ids per layer, referential integrity between layers,
//! and embedding dimensions that match the catalog metadata.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::meta::{load_catalog_meta, write_catalog_meta, CatalogMeta, META_FILENAME};
use crate::search::{scan_scoped, ScoredHit};

// ============================================================================
// Constants
// ============================================================================

/// Project records filename.
pub const PROJECTS_FILENAME: &str = "projects.jsonl";

/// Document records filename.
pub const DOCUMENTS_FILENAME: &str = "documents.jsonl";

/// Section records filename.
pub const SECTIONS_FILENAME: &str = "sections.jsonl";

// ============================================================================
// RecordLayer
// ============================================================================

/// The three descriptor layers held by a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLayer {
    /// Project profiles.
    Project,
    /// Document descriptors.
    Document,
    /// Section records.
    Section,
}

impl RecordLayer {
    /// Filename holding this layer's records.
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Project => PROJECTS_FILENAME,
            Self::Document => DOCUMENTS_FILENAME,
            Self::Section => SECTIONS_FILENAME,
        }
    }
}

impl std::fmt::Display for RecordLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Document => write!(f, "document"),
            Self::Section => write!(f, "section"),
        }
    }
}

// ============================================================================
// DescriptorRecord
// ============================================================================

/// A stored descriptor record.
///
/// The attribute payload is opaque JSON owned by the caller; `parent_id`
/// scopes searches (project for documents, document for sections) and
/// `project_id` is denormalized onto every non-project record so leakage
/// checks never need a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorRecord {
    /// Unique id within the layer.
    pub id: String,

    /// Owning parent id (None for project records).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Denormalized owning project id (None for project records).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Attribute payload (document type, themes, topics, page range, ...).
    pub attributes: serde_json::Value,

    /// The embedding vector.
    pub embedding: Vec<f32>,
}

// ============================================================================
// ProfileCatalog
// ============================================================================

/// A loaded descriptor catalog with scoped similarity search.
#[derive(Debug)]
pub struct ProfileCatalog {
    root: PathBuf,
    meta: CatalogMeta,
    projects: Vec<DescriptorRecord>,
    documents: Vec<DescriptorRecord>,
    sections: Vec<DescriptorRecord>,
}

impl ProfileCatalog {
    /// Create an empty catalog with fresh metadata (nothing is written until
    /// [`ProfileCatalog::save`]).
    pub fn create(root: impl Into<PathBuf>, meta: CatalogMeta) -> Self {
        Self {
            root: root.into(),
            meta,
            projects: Vec::new(),
            documents: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// Open an existing catalog from disk, validating integrity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CatalogNotFound`] if `meta.json` is absent, and
    /// [`StoreError::IntegrityViolation`] if the stored records violate
    /// uniqueness or referential constraints.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let meta_path = root.join(META_FILENAME);
        let meta = load_catalog_meta(&meta_path)?.ok_or(StoreError::CatalogNotFound {
            path: meta_path.clone(),
        })?;

        let projects = read_records(&root.join(PROJECTS_FILENAME))?;
        let documents = read_records(&root.join(DOCUMENTS_FILENAME))?;
        let sections = read_records(&root.join(SECTIONS_FILENAME))?;

        debug!(
            projects = projects.len(),
            documents = documents.len(),
            sections = sections.len(),
            "Opened descriptor catalog at {}",
            root.display()
        );

        let catalog = Self {
            root,
            meta,
            projects,
            documents,
            sections,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog metadata.
    pub fn meta(&self) -> &CatalogMeta {
        &self.meta
    }

    /// The catalog root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Replace all records of a layer.
    ///
    /// Validates embedding dimensions against the catalog metadata; full
    /// referential validation runs on [`ProfileCatalog::save`] and
    /// [`ProfileCatalog::open`].
    pub fn replace_layer(
        &mut self,
        layer: RecordLayer,
        records: Vec<DescriptorRecord>,
    ) -> StoreResult<()> {
        for record in &records {
            if record.embedding.len() != self.meta.dimension {
                return Err(StoreError::RecordDimensionMismatch {
                    id: record.id.clone(),
                    expected: self.meta.dimension,
                    actual: record.embedding.len(),
                });
            }
        }

        match layer {
            RecordLayer::Project => self.projects = records,
            RecordLayer::Document => self.documents = records,
            RecordLayer::Section => self.sections = records,
        }
        Ok(())
    }

    /// Records of a layer.
    pub fn records(&self, layer: RecordLayer) -> &[DescriptorRecord] {
        match layer {
            RecordLayer::Project => &self.projects,
            RecordLayer::Document => &self.documents,
            RecordLayer::Section => &self.sections,
        }
    }

    /// Look up a single record by id.
    pub fn get(&self, layer: RecordLayer, id: &str) -> Option<&DescriptorRecord> {
        self.records(layer).iter().find(|r| r.id == id)
    }

    /// Check that every id in `ids` exists in the given layer.
    ///
    /// Returns the first missing id, if any.
    pub fn missing_id<'a>(&self, layer: RecordLayer, ids: &'a [String]) -> Option<&'a str> {
        let known: HashSet<&str> = self.records(layer).iter().map(|r| r.id.as_str()).collect();
        ids.iter().map(|s| s.as_str()).find(|id| !known.contains(id))
    }

    /// Scoped nearest-neighbor search within one layer.
    ///
    /// `scope` restricts candidates to records whose `parent_id` is in the
    /// given set; `None` searches the whole layer (Project layer only).
    /// Results are sorted by similarity descending with id tiebreak.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DimensionMismatch`] when the query vector does
    /// not match the catalog dimension.
    pub fn search(
        &self,
        layer: RecordLayer,
        scope: Option<&[String]>,
        query: &[f32],
        top_k: usize,
    ) -> StoreResult<Vec<ScoredHit>> {
        if query.len() != self.meta.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.meta.dimension,
                actual: query.len(),
            });
        }

        Ok(scan_scoped(self.records(layer), scope, query, top_k))
    }

    /// Validate uniqueness and referential integrity across layers.
    ///
    /// - ids unique within each layer;
    /// - every document's `parent_id` names an existing project;
    /// - every section's `parent_id` names an existing document, and its
    ///   denormalized `project_id` matches that document's project.
    pub fn validate(&self) -> StoreResult<()> {
        let project_ids = unique_ids(RecordLayer::Project, &self.projects)?;
        let document_ids = unique_ids(RecordLayer::Document, &self.documents)?;
        unique_ids(RecordLayer::Section, &self.sections)?;

        let document_projects: HashMap<&str, &str> = self
            .documents
            .iter()
            .filter_map(|d| Some((d.id.as_str(), d.parent_id.as_deref()?)))
            .collect();

        for document in &self.documents {
            let parent = document.parent_id.as_deref().ok_or_else(|| {
                StoreError::integrity(format!("Document '{}' has no owning project", document.id))
            })?;
            if !project_ids.contains(parent) {
                return Err(StoreError::integrity(format!(
                    "Document '{}' references unknown project '{}'",
                    document.id, parent
                )));
            }
        }

        for section in &self.sections {
            let parent = section.parent_id.as_deref().ok_or_else(|| {
                StoreError::integrity(format!("Section '{}' has no owning document", section.id))
            })?;
            if !document_ids.contains(parent) {
                return Err(StoreError::integrity(format!(
                    "Section '{}' references unknown document '{}'",
                    section.id, parent
                )));
            }
            let expected_project = document_projects.get(parent).copied();
            if section.project_id.as_deref() != expected_project {
                return Err(StoreError::integrity(format!(
                    "Section '{}' project id {:?} does not match its document's project {:?}",
                    section.id, section.project_id, expected_project
                )));
            }
        }

        Ok(())
    }

    /// Validate and write the catalog (records + refreshed metadata) to disk.
    pub fn save(&mut self) -> StoreResult<()> {
        self.validate()?;

        fs::create_dir_all(&self.root)
            .map_err(|e| StoreError::catalog_io(&self.root, e.to_string()))?;

        write_records(&self.root.join(PROJECTS_FILENAME), &self.projects)?;
        write_records(&self.root.join(DOCUMENTS_FILENAME), &self.documents)?;
        write_records(&self.root.join(SECTIONS_FILENAME), &self.sections)?;

        self.meta.project_count = self.projects.len() as u64;
        self.meta.document_count = self.documents.len() as u64;
        self.meta.section_count = self.sections.len() as u64;
        self.meta.touch();
        write_catalog_meta(&self.root.join(META_FILENAME), &self.meta)?;

        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn unique_ids(layer: RecordLayer, records: &[DescriptorRecord]) -> StoreResult<HashSet<&str>> {
    let mut ids = HashSet::with_capacity(records.len());
    for record in records {
        if !ids.insert(record.id.as_str()) {
            return Err(StoreError::integrity(format!(
                "Duplicate {} id '{}'",
                layer, record.id
            )));
        }
    }
    Ok(ids)
}

fn read_records(path: &Path) -> StoreResult<Vec<DescriptorRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path).map_err(|e| StoreError::catalog_io(path, e.to_string()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| StoreError::catalog_io(path, e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: DescriptorRecord = serde_json::from_str(&line).map_err(|e| {
            StoreError::catalog_parse(path, format!("line {}: {}", line_num + 1, e))
        })?;
        records.push(record);
    }
    Ok(records)
}

fn write_records(path: &Path, records: &[DescriptorRecord]) -> StoreResult<()> {
    let mut file = File::create(path).map_err(|e| StoreError::catalog_io(path, e.to_string()))?;
    for record in records {
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line).map_err(|e| StoreError::catalog_io(path, e.to_string()))?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn meta() -> CatalogMeta {
        CatalogMeta::new("hash", "feature-hash-2", 2, "v1")
    }

    fn record(
        id: &str,
        parent: Option<&str>,
        project: Option<&str>,
        embedding: Vec<f32>,
    ) -> DescriptorRecord {
        DescriptorRecord {
            id: id.to_string(),
            parent_id: parent.map(String::from),
            project_id: project.map(String::from),
            attributes: json!({"docType": "report"}),
            embedding,
        }
    }

    fn sample_catalog(root: &Path) -> ProfileCatalog {
        let mut catalog = ProfileCatalog::create(root, meta());
        catalog
            .replace_layer(
                RecordLayer::Project,
                vec![
                    record("p1", None, None, vec![1.0, 0.0]),
                    record("p2", None, None, vec![0.0, 1.0]),
                ],
            )
            .unwrap();
        catalog
            .replace_layer(
                RecordLayer::Document,
                vec![
                    record("d1", Some("p1"), Some("p1"), vec![1.0, 0.0]),
                    record("d2", Some("p2"), Some("p2"), vec![0.0, 1.0]),
                ],
            )
            .unwrap();
        catalog
            .replace_layer(
                RecordLayer::Section,
                vec![record("s1", Some("d1"), Some("p1"), vec![1.0, 0.0])],
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_save_and_open_round_trip() {
        let dir = tempdir().unwrap();
        let mut catalog = sample_catalog(dir.path());
        catalog.save().unwrap();

        let reopened = ProfileCatalog::open(dir.path()).unwrap();
        assert_eq!(reopened.records(RecordLayer::Project).len(), 2);
        assert_eq!(reopened.records(RecordLayer::Document).len(), 2);
        assert_eq!(reopened.records(RecordLayer::Section).len(), 1);
        assert_eq!(reopened.meta().project_count, 2);
    }

    #[test]
    fn test_open_missing_catalog() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            ProfileCatalog::open(dir.path()),
            Err(StoreError::CatalogNotFound { .. })
        ));
    }

    #[test]
    fn test_orphan_document_rejected() {
        let dir = tempdir().unwrap();
        let mut catalog = sample_catalog(dir.path());
        catalog
            .replace_layer(
                RecordLayer::Document,
                vec![record("d1", Some("ghost"), Some("ghost"), vec![1.0, 0.0])],
            )
            .unwrap();
        assert!(matches!(
            catalog.validate(),
            Err(StoreError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn test_section_project_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let mut catalog = sample_catalog(dir.path());
        catalog
            .replace_layer(
                RecordLayer::Section,
                vec![record("s1", Some("d1"), Some("p2"), vec![1.0, 0.0])],
            )
            .unwrap();
        assert!(matches!(
            catalog.validate(),
            Err(StoreError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dir = tempdir().unwrap();
        let mut catalog = sample_catalog(dir.path());
        catalog
            .replace_layer(
                RecordLayer::Project,
                vec![
                    record("p1", None, None, vec![1.0, 0.0]),
                    record("p1", None, None, vec![0.0, 1.0]),
                ],
            )
            .unwrap();
        assert!(matches!(
            catalog.validate(),
            Err(StoreError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn test_record_dimension_checked_on_insert() {
        let dir = tempdir().unwrap();
        let mut catalog = ProfileCatalog::create(dir.path(), meta());
        let result = catalog.replace_layer(
            RecordLayer::Project,
            vec![record("p1", None, None, vec![1.0, 0.0, 0.0])],
        );
        assert!(matches!(
            result,
            Err(StoreError::RecordDimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_query_dimension_checked_on_search() {
        let dir = tempdir().unwrap();
        let catalog = sample_catalog(dir.path());
        let result = catalog.search(RecordLayer::Project, None, &[1.0, 0.0, 0.0], 5);
        assert!(matches!(result, Err(StoreError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_scoped_search_excludes_other_parents() {
        let dir = tempdir().unwrap();
        let catalog = sample_catalog(dir.path());
        let scope = vec!["p1".to_string()];
        let hits = catalog
            .search(RecordLayer::Document, Some(&scope), &[0.0, 1.0], 5)
            .unwrap();
        // d2 is the nearest overall but belongs to p2; scope must exclude it.
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "d1");
    }

    #[test]
    fn test_missing_id_lookup() {
        let dir = tempdir().unwrap();
        let catalog = sample_catalog(dir.path());
        let ids = vec!["p1".to_string(), "p9".to_string()];
        assert_eq!(catalog.missing_id(RecordLayer::Project, &ids), Some("p9"));
        let ok = vec!["p1".to_string(), "p2".to_string()];
        assert_eq!(catalog.missing_id(RecordLayer::Project, &ok), None);
    }
}
