//! Table rendering for CLI output using comfy-table.
//!
//! ## Tables Overview
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `hnk ask` (clarify) | `render_options_table()` |
//! | `hnk session list` | `render_sessions_table()` |
//! | `hnk status` | `render_catalog_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use super::format::{format_relative_time, truncate_str};

/// One clarification option row.
#[derive(Debug, Clone)]
pub struct OptionRow {
    /// Candidate entity id.
    pub id: String,
    /// Distinguishing value shown for this candidate.
    pub value: String,
}

/// One session row for `hnk session list`.
#[derive(Debug, Clone)]
pub struct SessionRow {
    /// Session id.
    pub id: String,
    /// Current stage label.
    pub stage: String,
    /// Locked project scope, joined for display.
    pub project_lock: Option<String>,
    /// Last update timestamp.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Render clarification options for an ambiguous layer.
///
/// # Example Output
///
/// ```text
/// OPTION   ID          VALUE
/// 1        atlas-msa   contract
/// 2        atlas-prop  proposal
/// ```
pub fn render_options_table(options: &[OptionRow]) -> String {
    if options.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.set_header(vec![
        Cell::new("OPTION").set_alignment(CellAlignment::Right),
        Cell::new("ID"),
        Cell::new("VALUE"),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),  // OPTION
        ColumnConstraint::LowerBoundary(Width::Fixed(14)), // ID
        ColumnConstraint::LowerBoundary(Width::Fixed(20)), // VALUE
    ]);

    for (index, option) in options.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1).set_alignment(CellAlignment::Right),
            Cell::new(truncate_str(&option.id, 24)),
            Cell::new(truncate_str(&option.value, 48)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render the session list.
///
/// # Example Output
///
/// ```text
/// SESSION    STAGE                   LOCK      UPDATED
/// support-7  awaitingClarification   atlas     3h ago
/// ```
pub fn render_sessions_table(sessions: &[SessionRow]) -> String {
    if sessions.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.set_header(vec![
        Cell::new("SESSION"),
        Cell::new("STAGE"),
        Cell::new("LOCK"),
        Cell::new("UPDATED"),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(10)), // SESSION
        ColumnConstraint::LowerBoundary(Width::Fixed(20)), // STAGE
        ColumnConstraint::LowerBoundary(Width::Fixed(10)), // LOCK
        ColumnConstraint::LowerBoundary(Width::Fixed(10)), // UPDATED
    ]);

    for session in sessions {
        table.add_row(vec![
            Cell::new(truncate_str(&session.id, 20)),
            Cell::new(&session.stage),
            Cell::new(session.project_lock.as_deref().unwrap_or("-")),
            Cell::new(format_relative_time(session.updated_at)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Render catalog layer counts for `hnk status`.
///
/// # Example Output
///
/// ```text
/// LAYER       RECORDS
/// projects          4
/// documents        38
/// sections        412
/// ```
pub fn render_catalog_table(rows: &[(&str, u64)]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.set_header(vec![
        Cell::new("LAYER"),
        Cell::new("RECORDS").set_alignment(CellAlignment::Right),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(10)), // LAYER
        ColumnConstraint::LowerBoundary(Width::Fixed(8)),  // RECORDS
    ]);

    for (layer, count) in rows {
        table.add_row(vec![
            Cell::new(*layer),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }

    table.trim_fmt().to_string()
}
