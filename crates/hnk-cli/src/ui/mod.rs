//! # CLI UI Module
//!
//! Consistent styling and formatting layer for hnk CLI output.
//!
//! ## Design Principles
//!
//! 1. **Scannable**: Users should identify success/failure in < 1 second
//! 2. **Consistent**: Same patterns across all commands
//! 3. **Accessible**: Work without colors (respect `NO_COLOR`)
//! 4. **Scriptable**: Machine-parseable with `--json` flag
//!
//! ## Module Structure
//!
//! - `color`: Color mode resolution for the `--color` flag
//! - `style`: Message types, prefixes, and styling functions
//! - `format`: Utility formatters (time, truncation)
//! - `table`: Table rendering with comfy-table

pub mod color;
pub mod format;
pub mod style;
pub mod table;

// Re-export main types for convenient access
pub use color::ColorMode;
pub use style::{MessageType, Style};
