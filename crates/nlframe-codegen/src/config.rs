//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for candidate resolution and rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Classifier probability below which a candidate is dropped
    pub confidence_threshold: f64,
    /// Maximum number of candidates offered to the user
    pub max_candidates: usize,
    /// Identifier the dataframe module is imported as
    pub module_alias: String,
    /// Variable module-level operations assign to
    pub result_binding: String,
    /// Marker reported when no candidate survives
    pub not_sure_marker: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            max_candidates: 4,
            module_alias: "pd".to_string(),
            result_binding: "result".to_string(),
            not_sure_marker: "NOT_SURE".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max;
        self
    }
}
