// Generated trainer configuration (finetune_config.yaml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::TrainingSettings;

/// Config file name inside the staging directory
pub const CONFIG_FILE_NAME: &str = "finetune_config.yaml";
/// Checkpoint output directory inside the staging directory
pub const DUMP_DIR_NAME: &str = "checkpoints";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinetuneConfig {
    pub dump_dir: PathBuf,
    pub steps: u32,
    pub data: DataSection,
    pub checkpoint: CheckpointSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    /// Dataset name -> mix weight
    pub datamix: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSection {
    /// Absolute path of the base checkpoint
    pub init_ckpt_path: PathBuf,
}

impl FinetuneConfig {
    /// Config for one run staged in `staging_dir`
    pub fn new(staging_dir: &Path, init_ckpt_path: PathBuf, settings: &TrainingSettings) -> Self {
        let mut datamix = BTreeMap::new();
        datamix.insert(settings.dataset_name.clone(), settings.datamix_weight);

        Self {
            dump_dir: staging_dir.join(DUMP_DIR_NAME),
            steps: settings.steps,
            data: DataSection { datamix },
            checkpoint: CheckpointSection { init_ckpt_path },
        }
    }

    /// Write as YAML to `<staging_dir>/finetune_config.yaml`
    pub fn write(&self, staging_dir: &Path) -> Result<PathBuf> {
        let path = staging_dir.join(CONFIG_FILE_NAME);
        let yaml = serde_yaml::to_string(self).context("Failed to serialize trainer config")?;
        fs::write(&path, yaml)
            .with_context(|| format!("Failed to write trainer config {}", path.display()))?;

        tracing::info!(path = %path.display(), steps = self.steps, "Wrote trainer config");
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
