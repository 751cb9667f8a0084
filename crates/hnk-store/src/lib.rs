//! # hnk-store
//!
//! Profile store for HNK - descriptor catalog persistence and scoped
//! similarity search.
//!
//! The narrowing kernel consumes precomputed descriptor records (project
//! profiles, document descriptors, section records) produced by an external
//! ingestion pipeline. This crate stores those records on disk and answers
//! scoped nearest-neighbor queries over them:
//!
//! - [`ProfileCatalog`] - a loaded catalog with per-layer JSONL persistence
//! - [`DescriptorRecord`] - a stored record (opaque attribute payload)
//! - [`CatalogMeta`] / [`check_catalog_compatibility`] - embedding-model
//!   compatibility guard
//! - [`ScoredHit`] - a search result with deterministic ordering
//!
//! ## Search Design
//!
//! Catalogs are descriptor summaries, not raw corpus text; a layer holds at
//! most a few hundred records. Search is therefore a rayon-parallel linear
//! cosine scan rather than an ANN index, which keeps results exact and
//! ordering fully deterministic (similarity descending, id ascending on
//! ties).

pub mod catalog;
pub mod error;
pub mod meta;
pub mod search;

pub use catalog::{
    DescriptorRecord, ProfileCatalog, RecordLayer, DOCUMENTS_FILENAME, PROJECTS_FILENAME,
    SECTIONS_FILENAME,
};
pub use error::{StoreError, StoreResult};
pub use meta::{
    check_catalog_compatibility, load_catalog_meta, write_catalog_meta, CatalogCompatibility,
    CatalogMeta, META_FILENAME,
};
pub use search::{cosine_similarity, ScoredHit};
