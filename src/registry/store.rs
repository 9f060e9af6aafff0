//! File-backed model registry.
//!
//! Layout: `<root>/registry.json`, pretty JSON holding every registered
//! model and its versions. Writes go to a sibling temp file that is then
//! renamed over the original, so a crash never leaves a torn registry.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{ModelVersion, RegisteredModel, Stage};

const REGISTRY_FILE: &str = "registry.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    models: BTreeMap<String, RegisteredModel>,
}

/// Registry rooted at a directory.
#[derive(Debug)]
pub struct ModelRegistry {
    path: PathBuf,
    state: RegistryFile,
}

impl ModelRegistry {
    /// Open the registry under `root`, starting empty if none exists yet.
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(REGISTRY_FILE);
        let state = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            RegistryFile::default()
        };
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    pub fn get_registered_model(&self, name: &str) -> Option<&RegisteredModel> {
        self.state.models.get(name)
    }

    /// Versions of `name`, oldest first. Empty for an unknown model.
    pub fn search_model_versions(&self, name: &str) -> &[ModelVersion] {
        self.state
            .models
            .get(name)
            .map(|model| model.versions.as_slice())
            .unwrap_or_default()
    }

    pub fn create_registered_model(&mut self, name: &str) -> Result<&RegisteredModel> {
        if self.state.models.contains_key(name) {
            bail!("registered model '{}' already exists", name);
        }
        let model = RegisteredModel {
            name: name.to_string(),
            created_at: Utc::now(),
            versions: Vec::new(),
        };
        Ok(self.state.models.entry(name.to_string()).or_insert(model))
    }

    /// Append a new version in stage `None`.
    pub fn register_model(
        &mut self,
        name: &str,
        run_id: &str,
        source: &str,
        metrics: BTreeMap<String, f64>,
    ) -> Result<&ModelVersion> {
        let Some(model) = self.state.models.get_mut(name) else {
            bail!("registered model '{}' does not exist", name);
        };
        let version = model.versions.iter().map(|v| v.version).max().unwrap_or(0) + 1;
        model.versions.push(ModelVersion {
            name: name.to_string(),
            version,
            run_id: run_id.to_string(),
            source: source.to_string(),
            metrics,
            stage: Stage::None,
            created_at: Utc::now(),
        });
        tracing::debug!("registered {} version {}", name, version);
        let idx = model.versions.len() - 1;
        Ok(&model.versions[idx])
    }

    pub fn transition_model_version_stage(
        &mut self,
        name: &str,
        version: u32,
        stage: Stage,
    ) -> Result<()> {
        let Some(entry) = self
            .state
            .models
            .get_mut(name)
            .and_then(|model| model.versions.iter_mut().find(|v| v.version == version))
        else {
            bail!("model '{}' has no version {}", name, version);
        };
        entry.stage = stage;
        Ok(())
    }

    pub fn production_version(&self, name: &str) -> Option<&ModelVersion> {
        self.search_model_versions(name)
            .iter()
            .find(|v| v.stage == Stage::Production)
    }
}
