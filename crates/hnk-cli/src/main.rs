//! # hnk CLI
//!
//! Command-line interface for the Hierarchical Narrowing Kernel.
//!
//! This binary provides human-friendly access to `hnk-core` functionality.
//! Run `hnk --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
