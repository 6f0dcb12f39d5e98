// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application settings
///
/// Every field has a default so a partial (or absent) config file works.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding base checkpoints (one entry per model)
    pub models_dir: PathBuf,

    /// Root of the external trainer checkout (None = ask every time)
    pub trainer_root: Option<PathBuf>,

    /// Training-specific settings
    pub training: TrainingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            trainer_root: None,
            training: TrainingSettings::default(),
        }
    }
}

/// Settings for dataset generation and the trainer invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingSettings {
    /// Human turn written into every manifest entry
    pub question: String,

    /// Step budget written to the generated config
    pub steps: u32,

    /// Dataset-mix weight for the generated dataset
    pub datamix_weight: u32,

    /// Registry key for the generated dataset
    pub dataset_name: String,

    /// Distributed launcher program
    pub launcher: PathBuf,

    /// Worker count passed to the launcher
    pub nproc_per_node: u32,

    /// Python module holding the training entry point
    pub train_module: String,

    /// Registry location relative to the trainer root
    pub registry_path: PathBuf,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            question: "What objects are in this image?".to_string(),
            steps: 500,
            datamix_weight: 1,
            dataset_name: "plm_finetune".to_string(),
            launcher: PathBuf::from("torchrun"),
            nproc_per_node: 1,
            train_module: "apps.plm.train".to_string(),
            registry_path: PathBuf::from("apps/plm/configs/datasets.yaml"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_training_settings() {
        let settings = TrainingSettings::default();
        assert_eq!(settings.steps, 500);
        assert_eq!(settings.datamix_weight, 1);
        assert_eq!(settings.nproc_per_node, 1);
        assert_eq!(settings.dataset_name, "plm_finetune");
        assert_eq!(settings.launcher, PathBuf::from("torchrun"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            trainer_root = "/opt/perception_models"

            [training]
            steps = 20
            "#,
        )
        .unwrap();

        assert_eq!(settings.trainer_root, Some(PathBuf::from("/opt/perception_models")));
        assert_eq!(settings.models_dir, PathBuf::from("models"));
        assert_eq!(settings.training.steps, 20);
        assert_eq!(settings.training.train_module, "apps.plm.train");
    }
}
