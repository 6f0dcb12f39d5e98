// Configuration module
// Public interface for configuration loading

mod loader;
mod settings;

pub use loader::{default_config_path, load_config, load_from_file, MODELS_DIR_ENV, TRAINER_ROOT_ENV};
pub use settings::{Settings, TrainingSettings};
