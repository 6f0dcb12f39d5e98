// Configuration loader
// Loads settings from --config, ~/.config/boxtrain/config.toml, or defaults,
// then applies environment overrides

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Settings;

/// Environment variable overriding `models_dir`
pub const MODELS_DIR_ENV: &str = "BOXTRAIN_MODELS_DIR";
/// Environment variable overriding `trainer_root`
pub const TRAINER_ROOT_ENV: &str = "BOXTRAIN_TRAINER_ROOT";

/// Load settings
///
/// An explicit path must exist. Without one, the per-user config file is used
/// when present and defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> Result<Settings> {
    let mut settings = match explicit {
        Some(path) => load_from_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => load_from_file(&path)?,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Settings::default()
            }
        },
    };

    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Parse a TOML settings file
pub fn load_from_file(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let settings: Settings = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::debug!(path = %path.display(), "Loaded config file");
    Ok(settings)
}

/// `<config_dir>/boxtrain/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("boxtrain").join("config.toml"))
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(dir) = std::env::var(MODELS_DIR_ENV) {
        if !dir.is_empty() {
            settings.models_dir = PathBuf::from(dir);
        }
    }

    if let Ok(root) = std::env::var(TRAINER_ROOT_ENV) {
        if !root.is_empty() {
            settings.trainer_root = Some(PathBuf::from(root));
        }
    }
}
