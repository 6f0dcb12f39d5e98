// Dataset registry patch with backup/restore
//
// The trainer finds datasets through its own YAML registry. A run adds one
// entry, and the original file is put back when the run ends. `RegistryPatch`
// restores on `restore()` or, failing that, on drop, so early returns,
// panics and cancelled futures all put the registry back.
//
// Not crash-safe: if the process dies between backup and restore, the
// patched registry stays in place next to `<registry>.bak`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::TrainingError;

/// Registry entry pointing the trainer at a staged dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Manifest (`train.jsonl`) path
    pub annotation: PathBuf,
    /// Staged images directory
    pub root_dir: PathBuf,
}

/// `<registry>.bak`
pub fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// An applied registry patch; restores the original content when finished
#[derive(Debug)]
pub struct RegistryPatch {
    path: PathBuf,
    backup_path: PathBuf,
    restored: bool,
}

impl RegistryPatch {
    /// Back up the registry, then add/overwrite `dataset_name`
    ///
    /// Fails with [`TrainingError::RegistryNotFound`] before touching
    /// anything if the registry does not exist. Any failure after the backup
    /// restores the original before returning.
    pub fn apply(path: &Path, dataset_name: &str, entry: &RegistryEntry) -> Result<Self> {
        if !path.is_file() {
            return Err(TrainingError::RegistryNotFound(path.to_path_buf()).into());
        }

        let backup_path = backup_path_for(path);
        fs::copy(path, &backup_path).with_context(|| {
            format!(
                "Failed to back up {} to {}",
                path.display(),
                backup_path.display()
            )
        })?;

        let patch = Self {
            path: path.to_path_buf(),
            backup_path,
            restored: false,
        };
        patch.write_entry(dataset_name, entry)?;

        tracing::info!(
            registry = %patch.path.display(),
            dataset = dataset_name,
            "Patched dataset registry"
        );
        Ok(patch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Move the backup over the registry
    ///
    /// Runs at most once; a failure here is reported and not retried on drop.
    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        restore_backup(&self.backup_path, &self.path)
    }

    fn write_entry(&self, dataset_name: &str, entry: &RegistryEntry) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        let mut registry = match serde_yaml::from_str::<Value>(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?
        {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            other => bail!(
                "Dataset registry {} is not a mapping (found {:?})",
                self.path.display(),
                other
            ),
        };

        let entry = serde_yaml::to_value(entry).context("Failed to serialize registry entry")?;
        registry.insert(Value::String(dataset_name.to_string()), entry);

        let yaml = serde_yaml::to_string(&registry).context("Failed to serialize registry")?;
        fs::write(&self.path, yaml)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

impl Drop for RegistryPatch {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        match restore_backup(&self.backup_path, &self.path) {
            Ok(()) => tracing::warn!(
                registry = %self.path.display(),
                "Dataset registry restored during unwind"
            ),
            Err(e) => tracing::error!(
                registry = %self.path.display(),
                error = %e,
                "Failed to restore dataset registry"
            ),
        }
    }
}

fn restore_backup(backup_path: &Path, path: &Path) -> Result<()> {
    fs::rename(backup_path, path).with_context(|| {
        format!(
            "Failed to restore {} from {}",
            path.display(),
            backup_path.display()
        )
    })?;
    tracing::info!(registry = %path.display(), "Restored dataset registry");
    Ok(())
}
