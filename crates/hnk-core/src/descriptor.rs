//! Descriptor record types produced by the ingestion collaborator.
//!
//! HNK consumes finished descriptor records; it never parses raw corpus
//! files. The types here mirror the JSONL interchange format written by the
//! ingestion pipeline, validate structural invariants, and convert to/from
//! the stored catalog representation.
//!
//! ## Key Types
//!
//! - [`ProjectProfile`] - per-project summary, themes, type inventory
//! - [`DocumentDescriptor`] - per-document type, summary, topics
//! - [`SectionRecord`] - per-section title, page range, excerpt
//! - [`PageRange`] - validated 1-based inclusive page span

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::HnkError;
use crate::types::{CandidateFacets, Layer};
use hnk_store::DescriptorRecord;

// ============================================================================
// PageRange
// ============================================================================

/// Inclusive 1-based page span of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRange {
    /// First page (>= 1).
    pub start: u32,
    /// Last page (>= start).
    pub end: u32,
}

impl PageRange {
    /// Create a validated page range.
    pub fn new(start: u32, end: u32) -> Result<Self, String> {
        if start < 1 {
            return Err(format!("page start must be >= 1, got {}", start));
        }
        if end < start {
            return Err(format!("page end {} precedes start {}", end, start));
        }
        Ok(Self { start, end })
    }
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "p. {}", self.start)
        } else {
            write!(f, "pp. {}-{}", self.start, self.end)
        }
    }
}

// ============================================================================
// ProjectProfile
// ============================================================================

/// Semantic profile of one project.
///
/// Created during ingestion and immutable until re-ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProfile {
    /// Unique project id.
    pub project_id: String,

    /// Short natural-language summary of the project.
    pub summary: String,

    /// Dominant themes.
    #[serde(default)]
    pub themes: BTreeSet<String>,

    /// Document-type inventory (type -> count).
    #[serde(default)]
    pub doc_types: BTreeMap<String, u64>,

    /// Precomputed embedding; computed at load time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ProjectProfile {
    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), HnkError> {
        if self.project_id.trim().is_empty() {
            return Err(HnkError::InvalidDescriptor {
                id: "<unnamed>".to_string(),
                message: "project id must be non-empty".to_string(),
            });
        }
        if self.summary.trim().is_empty() {
            return Err(HnkError::InvalidDescriptor {
                id: self.project_id.clone(),
                message: "project summary must be non-empty".to_string(),
            });
        }
        Ok(())
    }

    /// Text embedded when no precomputed vector is supplied.
    pub fn embedding_text(&self) -> String {
        let themes: Vec<&str> = self.themes.iter().map(|s| s.as_str()).collect();
        format!("{} {}", self.summary, themes.join(" "))
    }

    /// Convert to the stored catalog representation.
    pub fn to_record(&self, embedding: Vec<f32>) -> DescriptorRecord {
        DescriptorRecord {
            id: self.project_id.clone(),
            parent_id: None,
            project_id: None,
            attributes: serde_json::json!({
                "label": self.project_id,
                "summary": self.summary,
                "themes": self.themes,
                "docTypes": self.doc_types,
            }),
            embedding,
        }
    }
}

// ============================================================================
// DocumentDescriptor
// ============================================================================

/// Semantic descriptor of one document within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDescriptor {
    /// Unique document id.
    pub document_id: String,

    /// Owning project (foreign key; orphans are rejected at load).
    pub project_id: String,

    /// Document type (e.g., "contract", "proposal", "report").
    pub doc_type: String,

    /// Short summary.
    pub summary: String,

    /// Key topics.
    #[serde(default)]
    pub topics: BTreeSet<String>,

    /// Precomputed embedding; computed at load time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl DocumentDescriptor {
    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), HnkError> {
        if self.document_id.trim().is_empty() {
            return Err(HnkError::InvalidDescriptor {
                id: "<unnamed>".to_string(),
                message: "document id must be non-empty".to_string(),
            });
        }
        if self.project_id.trim().is_empty() {
            return Err(HnkError::InvalidDescriptor {
                id: self.document_id.clone(),
                message: "document must name an owning project".to_string(),
            });
        }
        if self.doc_type.trim().is_empty() {
            return Err(HnkError::InvalidDescriptor {
                id: self.document_id.clone(),
                message: "document type must be non-empty".to_string(),
            });
        }
        Ok(())
    }

    /// Text embedded when no precomputed vector is supplied.
    pub fn embedding_text(&self) -> String {
        let topics: Vec<&str> = self.topics.iter().map(|s| s.as_str()).collect();
        format!("{} {} {}", self.doc_type, self.summary, topics.join(" "))
    }

    /// Convert to the stored catalog representation.
    pub fn to_record(&self, embedding: Vec<f32>) -> DescriptorRecord {
        DescriptorRecord {
            id: self.document_id.clone(),
            parent_id: Some(self.project_id.clone()),
            project_id: Some(self.project_id.clone()),
            attributes: serde_json::json!({
                "label": self.summary,
                "docType": self.doc_type,
                "summary": self.summary,
                "topics": self.topics,
            }),
            embedding,
        }
    }
}

// ============================================================================
// SectionRecord
// ============================================================================

/// One retrievable section of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    /// Unique section id.
    pub section_id: String,

    /// Owning document (foreign key).
    pub document_id: String,

    /// Owning project, denormalized for fast scoping and leakage checks.
    pub project_id: String,

    /// Title or inferred label.
    pub title: String,

    /// Page span within the document.
    pub pages: PageRange,

    /// Stored snippet returned with the final result.
    #[serde(default)]
    pub excerpt: String,

    /// Precomputed embedding; computed at load time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl SectionRecord {
    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), HnkError> {
        if self.section_id.trim().is_empty() {
            return Err(HnkError::InvalidDescriptor {
                id: "<unnamed>".to_string(),
                message: "section id must be non-empty".to_string(),
            });
        }
        if self.document_id.trim().is_empty() || self.project_id.trim().is_empty() {
            return Err(HnkError::InvalidDescriptor {
                id: self.section_id.clone(),
                message: "section must name its owning document and project".to_string(),
            });
        }
        PageRange::new(self.pages.start, self.pages.end).map_err(|message| {
            HnkError::InvalidDescriptor {
                id: self.section_id.clone(),
                message,
            }
        })?;
        Ok(())
    }

    /// Text embedded when no precomputed vector is supplied.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.excerpt)
    }

    /// Convert to the stored catalog representation.
    pub fn to_record(&self, embedding: Vec<f32>) -> DescriptorRecord {
        DescriptorRecord {
            id: self.section_id.clone(),
            parent_id: Some(self.document_id.clone()),
            project_id: Some(self.project_id.clone()),
            attributes: serde_json::json!({
                "label": self.title,
                "title": self.title,
                "pageStart": self.pages.start,
                "pageEnd": self.pages.end,
                "excerpt": self.excerpt,
                "documentId": self.document_id,
            }),
            embedding,
        }
    }

    /// Reconstruct a section from a stored catalog record.
    pub fn from_record(record: &DescriptorRecord) -> Result<Self, HnkError> {
        let attrs = &record.attributes;
        let title = attrs
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let start = attrs.get("pageStart").and_then(|v| v.as_u64()).unwrap_or(1) as u32;
        let end = attrs.get("pageEnd").and_then(|v| v.as_u64()).unwrap_or(start as u64) as u32;
        let excerpt = attrs
            .get("excerpt")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let section = Self {
            section_id: record.id.clone(),
            document_id: record.parent_id.clone().unwrap_or_default(),
            project_id: record.project_id.clone().unwrap_or_default(),
            title,
            pages: PageRange { start, end },
            excerpt,
            embedding: None,
        };
        section.validate()?;
        Ok(section)
    }
}

// ============================================================================
// Facet extraction
// ============================================================================

/// Build scorer facets from a stored attribute payload.
pub fn facets_from_attributes(layer: Layer, attributes: &serde_json::Value) -> CandidateFacets {
    let str_field = |key: &str| {
        attributes
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };
    let set_field = |key: &str| -> BTreeSet<String> {
        attributes
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut facets = CandidateFacets {
        label: str_field("label").unwrap_or_default(),
        ..Default::default()
    };

    match layer {
        Layer::Project => {
            facets.themes = set_field("themes");
            // The type inventory collapses to its keys for discrimination.
            if let Some(map) = attributes.get("docTypes").and_then(|v| v.as_object()) {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                facets.doc_type = (map.len() == 1).then(|| keys[0].clone());
            }
        }
        Layer::Document => {
            facets.doc_type = str_field("docType");
            facets.topics = set_field("topics");
        }
        Layer::Section => {
            facets.title = str_field("title");
        }
    }

    facets
}

// ============================================================================
// Tests
// ============================================================================
