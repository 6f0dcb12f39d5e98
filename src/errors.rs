// User-friendly error messages
//
// Typed failure kinds for the training launcher, plus helpers that turn
// technical errors into actionable messages.

use std::fmt;
use std::path::PathBuf;

/// Failures that abort a training launch before (or while) it touches the
/// external trainer tree.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    /// No base checkpoint is available or none was selected
    #[error("No model selected.")]
    NoModelSelected,

    /// The trainer repository path was not provided (picker cancelled)
    #[error("Training cancelled. Perception Models repository path not provided.")]
    TrainerRootNotProvided,

    /// The dataset registry is missing from the trainer tree
    #[error("Dataset registry not found: {}", .0.display())]
    RegistryNotFound(PathBuf),

    /// A run is already in flight
    #[error("A training run is already in progress")]
    AlreadyRunning,
}

/// Format a missing registry error with helpful suggestions
pub fn registry_not_found_error(path: &str) -> String {
    format!(
        "Dataset registry not found: {}\n\n\
        \x1b[1;33mPossible causes:\x1b[0m\n\
        • Wrong trainer repository selected\n\
        • Trainer checkout is incomplete\n\
        • A previous run left only datasets.yaml.bak behind\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Check the trainer tree:\n\
           \x1b[36mls -la $(dirname \"{}\")\x1b[0m\n\n\
        2. Recover from a leftover backup:\n\
           \x1b[36mmv {}.bak {}\x1b[0m",
        path, path, path, path
    )
}

/// Format an annotation file error with helpful suggestions
pub fn annotation_file_error(path: &str, error: &str) -> String {
    format!(
        "Failed to read annotations from {}\n\n\
        \x1b[1;33mError:\x1b[0m {}\n\n\
        \x1b[1;32mTry:\x1b[0m\n\
        1. Inspect the annotation files:\n\
           \x1b[36mls -la {}\x1b[0m\n\n\
        2. Expected format:\n\
           [{{\"box\": [x1, y1, x2, y2], \"label\": \"car\"}}]",
        path, error, path
    )
}

/// Wrap a generic error with suggestions
pub fn wrap_error_with_suggestion(error: impl fmt::Display, suggestion: &str) -> String {
    format!(
        "{}\n\n\
        \x1b[1;33mSuggestion:\x1b[0m {}",
        error, suggestion
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_error_messages() {
        assert_eq!(TrainingError::NoModelSelected.to_string(), "No model selected.");
        assert!(TrainingError::TrainerRootNotProvided
            .to_string()
            .starts_with("Training cancelled."));
        let err = TrainingError::RegistryNotFound(PathBuf::from("/tmp/datasets.yaml"));
        assert!(err.to_string().contains("/tmp/datasets.yaml"));
    }

    #[test]
    fn test_registry_not_found_has_recovery_hint() {
        let msg = registry_not_found_error("/repo/apps/plm/configs/datasets.yaml");
        assert!(msg.contains("datasets.yaml.bak"));
        assert!(msg.contains("mv "));
    }

    #[test]
    fn test_wrap_error_with_suggestion() {
        let msg = wrap_error_with_suggestion("boom", "try again");
        assert!(msg.starts_with("boom"));
        assert!(msg.contains("try again"));
    }
}
