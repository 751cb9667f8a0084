//! Configuration types for HNK.
//!
//! This module provides the configuration structures used by the engine:
//! - [`GlobalConfig`]: user-level configuration stored in `~/.hnk/config.yaml`
//! - [`NarrowingConfig`]: per-layer thresholds and the clarification budget
//!
//! Defaults work with zero configuration; a config file only overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{GLOBAL_CONFIG_FILENAME, HNK_HOME_DIR};
use crate::errors::HnkError;
use crate::scorer::{LayerThresholds, DEFAULT_SECTION_DECISIVE_GAP};
use crate::types::Layer;
use hnk_embed::EmbedConfig;

// ============================================================================
// NarrowingConfig
// ============================================================================

/// Default clarification attempts allowed per layer per episode.
pub const DEFAULT_MAX_ATTEMPTS_PER_LAYER: u8 = 2;

/// Per-layer thresholds and the clarification budget.
///
/// The three layers share one decision rule; only these numbers differ. The
/// Section layer defaults to a tighter decisive gap because over-asking at
/// the finest layer costs the user the most.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrowingConfig {
    /// Project layer thresholds.
    #[serde(default)]
    pub project: LayerThresholds,

    /// Document layer thresholds.
    #[serde(default)]
    pub document: LayerThresholds,

    /// Section layer thresholds.
    #[serde(default = "default_section_thresholds")]
    pub section: LayerThresholds,

    /// Maximum clarification attempts per layer per episode.
    ///
    /// The design intent is at most one question per layer on the ideal
    /// path; this cap bounds runaway loops when answers stay ambiguous.
    #[serde(default = "default_max_attempts")]
    pub max_attempts_per_layer: u8,
}

fn default_section_thresholds() -> LayerThresholds {
    LayerThresholds {
        decisive_gap: DEFAULT_SECTION_DECISIVE_GAP,
        ..LayerThresholds::default()
    }
}

fn default_max_attempts() -> u8 {
    DEFAULT_MAX_ATTEMPTS_PER_LAYER
}

impl Default for NarrowingConfig {
    fn default() -> Self {
        Self {
            project: LayerThresholds::default(),
            document: LayerThresholds::default(),
            section: default_section_thresholds(),
            max_attempts_per_layer: DEFAULT_MAX_ATTEMPTS_PER_LAYER,
        }
    }
}

impl NarrowingConfig {
    /// Thresholds for a layer.
    pub fn thresholds(&self, layer: Layer) -> LayerThresholds {
        match layer {
            Layer::Project => self.project,
            Layer::Document => self.document,
            Layer::Section => self.section,
        }
    }
}

// ============================================================================
// GlobalConfig
// ============================================================================

/// Global (user-level) configuration for HNK.
///
/// Typically loaded from `~/.hnk/config.yaml`.
///
/// # Example YAML
///
/// ```yaml
/// embedding:
///   provider: http
///   modelId: nomic-embed-text
///   endpoint: http://localhost:11434/api/embed
///   dimension: 768
///
/// narrowing:
///   section:
///     minSim: 0.35
///     decisiveGap: 0.05
///   maxAttemptsPerLayer: 2
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    /// Embedding backend configuration.
    #[serde(default)]
    pub embedding: EmbedConfig,

    /// Narrowing thresholds and clarification budget.
    #[serde(default)]
    pub narrowing: NarrowingConfig,
}

impl GlobalConfig {
    /// Load the global configuration from the default location
    /// (`~/.hnk/config.yaml`).
    ///
    /// If the file does not exist, returns defaults so HNK works
    /// out-of-the-box.
    ///
    /// # Errors
    ///
    /// Returns [`HnkError::InvalidGlobalConfig`] if the file exists but
    /// cannot be parsed.
    pub fn load_default() -> Result<Self, HnkError> {
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load the global configuration from a specific path.
    ///
    /// If the file does not exist, returns a default configuration.
    pub fn from_path(path: &Path) -> Result<Self, HnkError> {
        if !path.exists() {
            tracing::debug!(
                "Global config not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            HnkError::InvalidGlobalConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            HnkError::InvalidGlobalConfig(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let warnings = config.validate()?;
        for warning in warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Get the default global config directory (`~/.hnk`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(HNK_HOME_DIR))
    }

    /// Get the default global config file path (`~/.hnk/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(GLOBAL_CONFIG_FILENAME))
    }

    /// Validate configuration values.
    ///
    /// Returns non-fatal warnings; fatal problems (values that would make
    /// narrowing meaningless) are errors.
    pub fn validate(&self) -> Result<Vec<String>, HnkError> {
        let mut warnings = Vec::new();

        if self.narrowing.max_attempts_per_layer == 0 {
            return Err(HnkError::InvalidConfiguration {
                message: "narrowing.maxAttemptsPerLayer is 0".to_string(),
                hint: "A zero budget would fail every ambiguous query; use at least 1.".to_string(),
            });
        }

        for (name, thresholds) in [
            ("project", &self.narrowing.project),
            ("document", &self.narrowing.document),
            ("section", &self.narrowing.section),
        ] {
            if thresholds.top_k == 0 {
                return Err(HnkError::InvalidConfiguration {
                    message: format!("narrowing.{}.topK is 0", name),
                    hint: "Retrieval needs at least one candidate; use topK >= 2.".to_string(),
                });
            }
            if !(0.0..=1.0).contains(&thresholds.min_sim) {
                warnings.push(format!(
                    "narrowing.{}.minSim {} is outside [0, 1]",
                    name, thresholds.min_sim
                ));
            }
            if thresholds.decisive_gap <= 0.0 || thresholds.decisive_gap >= 1.0 {
                warnings.push(format!(
                    "narrowing.{}.decisiveGap {} is outside (0, 1)",
                    name, thresholds.decisive_gap
                ));
            }
            if thresholds.pair_margin > thresholds.decisive_gap {
                warnings.push(format!(
                    "narrowing.{}.pairMargin {} exceeds decisiveGap {}; pair acceptance will never trigger",
                    name, thresholds.pair_margin, thresholds.decisive_gap
                ));
            }
        }

        Ok(warnings)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GlobalConfig::default();
        assert!(config.validate().unwrap().is_empty());
        assert_eq!(config.narrowing.max_attempts_per_layer, 2);
    }

    #[test]
    fn test_section_layer_has_tighter_gap() {
        let config = NarrowingConfig::default();
        assert!(
            config.thresholds(Layer::Section).decisive_gap
                < config.thresholds(Layer::Project).decisive_gap
        );
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = GlobalConfig::default();
        config.narrowing.max_attempts_per_layer = 0;
        assert!(matches!(
            config.validate(),
            Err(HnkError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_out_of_range_min_sim_warns() {
        let mut config = GlobalConfig::default();
        config.narrowing.project.min_sim = 1.5;
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("minSim"));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = GlobalConfig::from_path(Path::new("/nonexistent/hnk-config.yaml")).unwrap();
        assert_eq!(config.narrowing.max_attempts_per_layer, 2);
    }

    #[test]
    fn test_yaml_round_trip_with_overrides() {
        let yaml = r#"
embedding:
  provider: hash
  dimension: 128
narrowing:
  section:
    minSim: 0.4
    decisiveGap: 0.03
    topK: 4
    pairMargin: 0.01
  maxAttemptsPerLayer: 3
"#;
        let config: GlobalConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.narrowing.max_attempts_per_layer, 3);
        assert_eq!(config.narrowing.section.top_k, 4);
        assert!((config.narrowing.section.min_sim - 0.4).abs() < 1e-6);
        // Unspecified layers keep their defaults.
        assert_eq!(config.narrowing.project.top_k, 5);
    }
}
