// Base checkpoint discovery
//
// Every entry in the models directory is a selectable base checkpoint.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Label the model picker shows when the directory is empty
pub const NO_MODELS_PLACEHOLDER: &str = "No models found";

/// Entry names in `models_dir`, sorted
///
/// A missing directory yields an empty list.
pub fn discover(models_dir: &Path) -> Result<Vec<String>> {
    if !models_dir.exists() {
        tracing::debug!(dir = %models_dir.display(), "Models directory missing");
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(models_dir)
        .with_context(|| format!("Failed to read models directory {}", models_dir.display()))?
    {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    names.sort();
    Ok(names)
}

/// The model picker's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    models_dir: PathBuf,
    available: Vec<String>,
    selected: Option<String>,
}

impl ModelSelection {
    /// Discover models and preselect the first one
    pub fn discover(models_dir: impl Into<PathBuf>) -> Result<Self> {
        let models_dir = models_dir.into();
        let available = discover(&models_dir)?;
        let selected = available.first().cloned();
        Ok(Self {
            models_dir,
            available,
            selected,
        })
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }

    /// Selected model name (None when nothing is available)
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Picker label for the current state
    pub fn display_name(&self) -> &str {
        self.selected().unwrap_or(NO_MODELS_PLACEHOLDER)
    }

    /// Select a discovered model; false if the name is unknown
    pub fn select(&mut self, name: &str) -> bool {
        if self.available.iter().any(|m| m == name) {
            self.selected = Some(name.to_string());
            true
        } else {
            false
        }
    }

    /// `<models_dir>/<selected>` as an absolute path
    pub fn checkpoint_path(&self) -> Result<Option<PathBuf>> {
        self.selected
            .as_deref()
            .map(|name| checkpoint_path(&self.models_dir, name))
            .transpose()
    }
}

/// Absolute `<models_dir>/<name>` (symlinks are not resolved)
pub fn checkpoint_path(models_dir: &Path, name: &str) -> Result<PathBuf> {
    std::path::absolute(models_dir.join(name))
        .with_context(|| format!("Failed to resolve checkpoint path for {}", name))
}
