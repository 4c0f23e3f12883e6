//! Analysis parameters.
//!
//! Every section defaults to the values the pipeline was tuned with, so an
//! empty (or absent) TOML file yields a usable configuration:
//!
//! ```toml
//! [spacing]
//! line_tolerance = 0.2
//! para_multiplier = 1.1
//!
//! [zones]
//! header_height_in = 1.25
//! footer_height_in = 1.0
//!
//! [workflow]
//! sample_pages = 5
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::POINTS_PER_INCH;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub spacing: SpacingConfig,
    pub zones: ZoneConfig,
    pub workflow: WorkflowConfig,
}

/// Knobs for spacing-rule derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingConfig {
    /// Relative tolerance `t` around the modal gap for the line band.
    pub line_tolerance: f32,
    /// Multiplier `m` applied to the context size for the paragraph band.
    pub para_multiplier: f32,
    /// Contexts with fewer samples are flagged low-confidence.
    pub min_samples: usize,
    /// Gaps at or below this are extraction noise.
    pub gap_epsilon: f32,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 0.2,
            para_multiplier: 1.1,
            min_samples: 3,
            gap_epsilon: 0.01,
        }
    }
}

/// Header and footer zone heights, in inches from the page edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub header_height_in: f32,
    pub footer_height_in: f32,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            header_height_in: 1.25,
            footer_height_in: 1.0,
        }
    }
}

impl ZoneConfig {
    pub fn header_height_pts(&self) -> f32 {
        self.header_height_in * POINTS_PER_INCH
    }

    pub fn footer_height_pts(&self) -> f32 {
        self.footer_height_in * POINTS_PER_INCH
    }
}

/// Limits on how much of the document each analysis pass sends out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub sample_pages: usize,
    pub max_blocks_per_page: usize,
    pub max_block_chars: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            sample_pages: 5,
            max_blocks_per_page: 40,
            max_block_chars: 400,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &str| ConfigError::Invalid {
            field,
            reason: reason.to_string(),
        };

        if !(0.0..1.0).contains(&self.spacing.line_tolerance) {
            return Err(invalid("spacing.line_tolerance", "must lie in [0, 1)"));
        }
        if self.spacing.para_multiplier.is_nan() || self.spacing.para_multiplier <= 0.0 {
            return Err(invalid("spacing.para_multiplier", "must be positive"));
        }
        if self.spacing.gap_epsilon < 0.0 {
            return Err(invalid("spacing.gap_epsilon", "must not be negative"));
        }
        if self.zones.header_height_in < 0.0 || self.zones.footer_height_in < 0.0 {
            return Err(invalid("zones", "zone heights must not be negative"));
        }
        if self.workflow.sample_pages < 2 {
            return Err(invalid(
                "workflow.sample_pages",
                "must be at least 2 so the first and last page are both sampled",
            ));
        }
        Ok(())
    }
}
