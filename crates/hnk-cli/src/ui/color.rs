//! Color mode for CLI output.
//!
//! Colors are controlled by the `--color` flag (`always` / `never` / `auto`);
//! auto mode honors `NO_COLOR` (https://no-color.org/) and disables colors
//! when stdout is not a terminal.

use std::io::IsTerminal;

/// Resolved color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Force colors on, even when piped.
    Always,
    /// Force colors off.
    Never,
    /// Follow `NO_COLOR` and TTY detection.
    #[default]
    Auto,
}

impl ColorMode {
    /// Parse the `--color` flag value.
    pub fn from_flag(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }

    /// Whether output produced under this mode should be colored.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                std::env::var("NO_COLOR").is_err() && std::io::stdout().is_terminal()
            }
        }
    }
}
