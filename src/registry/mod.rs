//! Model registry: versioned training artifacts with lifecycle stages.
//!
//! Every training run registers a new version of its model. Promotion
//! follows one rule: at most one version is in `Production`. Registering
//! archives the current production version, then promotes either the new
//! version or, given a key metric, the version whose run scored best.

mod store;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use store::ModelRegistry;

/// Artifact path inside a run.
pub const ARTIFACT_TAG: &str = "artifact";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    None,
    Staging,
    Production,
    Archived,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::None => "None",
            Stage::Staging => "Staging",
            Stage::Production => "Production",
            Stage::Archived => "Archived",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Stage::None),
            "staging" => Ok(Stage::Staging),
            "production" => Ok(Stage::Production),
            "archived" => Ok(Stage::Archived),
            other => bail!(
                "unknown stage '{}' (expected none, staging, production or archived)",
                other
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: u32,
    pub run_id: String,
    pub source: String,
    /// Metrics of the run that produced this version.
    pub metrics: BTreeMap<String, f64>,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub versions: Vec<ModelVersion>,
}

/// A finished training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    /// Artifact location; defaults to `runs:/<run_id>/artifact`.
    pub source: Option<String>,
    pub metrics: BTreeMap<String, f64>,
}

impl RunRecord {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn artifact_uri(&self) -> String {
        self.source
            .clone()
            .unwrap_or_else(|| format!("runs:/{}/{}", self.run_id, ARTIFACT_TAG))
    }
}

/// Register `run` as a new version of `name` and update production.
///
/// Returns the version now in production, if any. With `key_metric`,
/// versions whose run lacks the metric are not candidates; the earliest
/// version wins ties. The registry is not saved.
pub fn create_model_version(
    registry: &mut ModelRegistry,
    name: &str,
    run: Option<&RunRecord>,
    key_metric: Option<&str>,
) -> Result<Option<u32>> {
    if registry.get_registered_model(name).is_none() {
        registry.create_registered_model(name)?;
    }

    let live: Vec<u32> = registry
        .search_model_versions(name)
        .iter()
        .filter(|v| v.stage == Stage::Production)
        .map(|v| v.version)
        .collect();
    for version in live {
        registry.transition_model_version_stage(name, version, Stage::Archived)?;
    }

    let mut promoted = None;
    if let Some(run) = run {
        let version = registry
            .register_model(name, &run.run_id, &run.artifact_uri(), run.metrics.clone())?
            .version;
        if key_metric.is_none() {
            registry.transition_model_version_stage(name, version, Stage::Production)?;
            tracing::info!("register last version to Production");
            promoted = Some(version);
        }
    }

    if let Some(metric) = key_metric {
        let scores: Vec<(u32, f64)> = registry
            .search_model_versions(name)
            .iter()
            .filter_map(|v| v.metrics.get(metric).map(|score| (v.version, *score)))
            .collect();
        tracing::info!("version metrics ({}): {:?}", metric, scores);

        let mut best: Option<(u32, f64)> = None;
        for (version, score) in scores {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((version, score)),
            }
        }

        match best {
            Some((version, _)) => {
                tracing::info!("register version {} to Production", version);
                registry.transition_model_version_stage(name, version, Stage::Production)?;
                promoted = Some(version);
            }
            None => tracing::warn!("no version of {} records metric '{}'", name, metric),
        }
    }

    Ok(promoted)
}
