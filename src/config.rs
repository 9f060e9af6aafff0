//! Configuration loading from pyproject.toml and tunekit.toml.
//!
//! Follows conventions from ruff, black, mypy for familiarity:
//! - `[tool.tunekit]` section in pyproject.toml
//! - Standalone tunekit.toml takes precedence
//!
//! ## Example
//!
//! ```toml
//! [tool.tunekit]
//! label-column = "target"
//! test-size = 0.2
//! random-state = 42
//! registry = "models/registry"
//! key-metric = "f1-score"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::DEFAULT_TEST_SIZE;

pub const DEFAULT_LABEL_COLUMN: &str = "label";
pub const DEFAULT_RANDOM_STATE: u64 = 1;
pub const DEFAULT_REGISTRY: &str = ".tunekit/registry";

/// Tunekit configuration. CLI flags override every field.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Source file for this config (for display).
    pub source: Option<PathBuf>,

    /// Column holding the class label.
    pub label_column: String,

    /// Fraction of a single csv file held out for testing.
    pub test_size: f64,

    /// Seed for the train/test shuffle.
    pub random_state: u64,

    /// Directory of the model registry.
    pub registry: PathBuf,

    /// Metric used to pick the production version.
    pub key_metric: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: None,
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            test_size: DEFAULT_TEST_SIZE,
            random_state: DEFAULT_RANDOM_STATE,
            registry: PathBuf::from(DEFAULT_REGISTRY),
            key_metric: None,
        }
    }
}

/// Raw config as deserialized from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    label_column: Option<String>,
    test_size: Option<f64>,
    random_state: Option<u64>,
    registry: Option<String>,
    key_metric: Option<String>,
}

/// Wrapper for pyproject.toml structure.
#[derive(Debug, Deserialize)]
struct PyProject {
    tool: Option<PyProjectTool>,
}

#[derive(Debug, Deserialize)]
struct PyProjectTool {
    tunekit: Option<RawConfig>,
}

impl Config {
    /// Load configuration from the given directory.
    ///
    /// Search order:
    /// 1. tunekit.toml in directory
    /// 2. pyproject.toml [tool.tunekit] in directory
    /// 3. Walk up to find pyproject.toml (like ruff)
    /// 4. Default config if nothing found
    pub fn load(directory: &Path) -> Self {
        let tunekit_toml = directory.join("tunekit.toml");
        if tunekit_toml.exists() {
            match Self::load_file(&tunekit_toml) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("ignoring {}: {:#}", tunekit_toml.display(), e),
            }
        }

        let mut current = Some(directory);
        while let Some(dir) = current {
            let pyproject = dir.join("pyproject.toml");
            if pyproject.exists() {
                if let Some(config) = Self::load_pyproject(&pyproject) {
                    return config;
                }
            }
            current = dir.parent();
        }

        Self::default()
    }

    /// Load an explicit config file (`--config`). Errors are fatal here.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(Self::from_raw(raw, path.to_path_buf()))
    }

    fn load_pyproject(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let pyproject: PyProject = toml::from_str(&content).ok()?;
        let raw = pyproject.tool?.tunekit?;
        Some(Self::from_raw(raw, path.to_path_buf()))
    }

    fn from_raw(raw: RawConfig, source: PathBuf) -> Self {
        let defaults = Self::default();
        Self {
            source: Some(source),
            label_column: raw.label_column.unwrap_or(defaults.label_column),
            test_size: raw.test_size.unwrap_or(defaults.test_size),
            random_state: raw.random_state.unwrap_or(defaults.random_state),
            registry: raw.registry.map(PathBuf::from).unwrap_or(defaults.registry),
            key_metric: raw.key_metric.or(defaults.key_metric),
        }
    }

    /// Format config for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        if let Some(ref source) = self.source {
            lines.push(format!("   Config: {}", source.display()));
        } else {
            lines.push("   Config: (defaults)".to_string());
        }

        lines.push(format!("   Label column: {}", self.label_column));
        lines.push(format!(
            "   Split: test_size={} random_state={}",
            self.test_size, self.random_state
        ));
        lines.push(format!("   Registry: {}", self.registry.display()));
        if let Some(ref metric) = self.key_metric {
            lines.push(format!("   Key metric: {}", metric));
        }

        lines.join("\n")
    }
}
