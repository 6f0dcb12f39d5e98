// Training run supervision
//
// Stages the dataset, writes the trainer config, patches the dataset
// registry, then runs the trainer and relays its output line by line.
// Everything here runs on the worker task; the UI only sees events.

use anyhow::{Context, Result};
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::ExitStatus;

use super::dataset::{self, PreparedDataset};
use super::events::{self, EventSender, RunSummary, TrainingEvent, TrainingState};
use super::finetune::FinetuneConfig;
use super::launcher::TrainerInvocation;
use super::registry::{RegistryEntry, RegistryPatch};
use crate::config::Settings;
use crate::errors::TrainingError;
use crate::models;

/// What the user picked for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Directory of images being annotated
    pub image_dir: PathBuf,
    /// Base checkpoint name under the models directory
    pub model: Option<String>,
    /// Trainer repository root (None = picker cancelled)
    pub trainer_root: Option<PathBuf>,
}

/// Sends `StateChanged(Idle)` when dropped, whatever ended the run
struct ControlRelease {
    events: EventSender,
}

impl Drop for ControlRelease {
    fn drop(&mut self) {
        events::state(&self.events, TrainingState::Idle);
    }
}

/// Run one fine-tuning job end to end
///
/// A missing model or trainer root is reported before any file is touched.
/// Once the registry has been patched it is restored on every exit path,
/// including when this future is dropped mid-run (the trainer process is
/// killed in that case). The control is released last.
pub async fn launch_training(
    request: LaunchRequest,
    settings: Settings,
    events: EventSender,
) -> Result<RunSummary> {
    let _release = ControlRelease {
        events: events.clone(),
    };

    let (model, trainer_root) = match validate(&request) {
        Ok(selection) => selection,
        Err(e) => {
            tracing::warn!(error = %e, "Training not started");
            events::log(&events, e.to_string());
            return Err(e.into());
        }
    };

    match run(&request, &model, &trainer_root, &settings, &events).await {
        Ok(summary) => Ok(summary),
        Err(e) => {
            tracing::error!(error = %e, "Training run failed");
            events::log(&events, format!("Error during training: {:#}", e));
            Err(e)
        }
    }
}

fn validate(request: &LaunchRequest) -> Result<(String, PathBuf), TrainingError> {
    let model = request
        .model
        .clone()
        .filter(|m| !m.is_empty() && m != models::NO_MODELS_PLACEHOLDER)
        .ok_or(TrainingError::NoModelSelected)?;
    let trainer_root = request
        .trainer_root
        .clone()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(TrainingError::TrainerRootNotProvided)?;
    Ok((model, trainer_root))
}

async fn run(
    request: &LaunchRequest,
    model: &str,
    trainer_root: &std::path::Path,
    settings: &Settings,
    events: &EventSender,
) -> Result<RunSummary> {
    let started_at = chrono::Utc::now();
    events::state(events, TrainingState::Preparing);

    // The trainer runs from its own root, so every path handed to it is absolute
    let image_dir = std::path::absolute(&request.image_dir)
        .with_context(|| format!("Failed to resolve {}", request.image_dir.display()))?;
    let trainer_root = std::path::absolute(trainer_root)
        .with_context(|| format!("Failed to resolve {}", trainer_root.display()))?;

    let registry_path = trainer_root.join(&settings.training.registry_path);
    if !registry_path.is_file() {
        return Err(TrainingError::RegistryNotFound(registry_path).into());
    }
    let checkpoint = models::checkpoint_path(&settings.models_dir, model)?;

    events::log(events, "Preparing data for PLM training...");
    let question = settings.training.question.clone();
    let dataset: PreparedDataset =
        tokio::task::spawn_blocking(move || dataset::prepare(&image_dir, &question))
            .await
            .context("Dataset preparation task failed")??;
    events::log(
        events,
        format!("PLM data preparation complete ({} images).", dataset.entries),
    );

    let config = FinetuneConfig::new(&dataset.staging_dir, checkpoint, &settings.training);
    let config_path = config.write(&dataset.staging_dir)?;

    let entry = RegistryEntry {
        annotation: dataset.manifest_path.clone(),
        root_dir: dataset.images_dir.clone(),
    };
    let patch = RegistryPatch::apply(&registry_path, &settings.training.dataset_name, &entry)?;

    let invocation = TrainerInvocation::new(&settings.training, &trainer_root, &config_path);
    events::log(events, format!("Starting training with model: {}", model));
    tracing::info!(command = %invocation, cwd = %trainer_root.display(), "Launching trainer");
    events::state(events, TrainingState::Running);

    let outcome = supervise(&invocation, events).await;
    let restored = patch.restore();

    let status = outcome?;
    restored?;

    let summary = RunSummary {
        staging_dir: dataset.staging_dir,
        entries: dataset.entries,
        exit_code: status.code(),
        success: status.success(),
        started_at,
        finished_at: chrono::Utc::now(),
    };

    if summary.success {
        tracing::info!("Trainer exited successfully");
    } else {
        tracing::warn!(exit_code = ?summary.exit_code, "Trainer exited with failure status");
    }
    let _ = events.send(TrainingEvent::Finished(summary.clone()));

    Ok(summary)
}

/// Spawn the trainer and relay its merged output until the pipe closes
async fn supervise(invocation: &TrainerInvocation, events: &EventSender) -> Result<ExitStatus> {
    let (reader, writer) = io::pipe().context("Failed to create trainer output pipe")?;
    let mut cmd = invocation
        .command(writer)
        .context("Failed to attach trainer output pipe")?;
    let spawned = cmd.spawn();
    // The command holds write ends too; the reader only sees EOF once they close
    drop(cmd);
    let mut child = spawned.with_context(|| format!("Failed to spawn trainer: {}", invocation))?;
    tracing::info!(pid = ?child.id(), "Trainer subprocess spawned");

    let relay_events = events.clone();
    let output = tokio::task::spawn_blocking(move || relay_lines(reader, &relay_events));
    output
        .await
        .context("Trainer output reader failed")?
        .context("Failed to read trainer output")?;

    let status = child
        .wait()
        .await
        .context("Failed to wait for trainer subprocess")?;
    events::log(events, "Training finished.");
    Ok(status)
}

fn relay_lines(reader: impl Read, events: &EventSender) -> io::Result<()> {
    for segment in BufReader::new(reader).split(b'\n') {
        relay(events, &segment?);
    }
    Ok(())
}

fn relay(events: &EventSender, bytes: &[u8]) {
    let line = String::from_utf8_lossy(bytes);
    let line = line.trim_end();
    tracing::info!(target: "trainer", "{}", line);
    events::log(events, line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::events::channel;

    fn request(model: Option<&str>, root: Option<&str>) -> LaunchRequest {
        LaunchRequest {
            image_dir: PathBuf::from("images"),
            model: model.map(str::to_string),
            trainer_root: root.map(PathBuf::from),
        }
    }

    #[test]
    fn test_validate_requires_model() {
        assert!(matches!(
            validate(&request(None, Some("/r"))),
            Err(TrainingError::NoModelSelected)
        ));
        assert!(matches!(
            validate(&request(Some(models::NO_MODELS_PLACEHOLDER), Some("/r"))),
            Err(TrainingError::NoModelSelected)
        ));
    }

    #[test]
    fn test_validate_requires_trainer_root() {
        assert!(matches!(
            validate(&request(Some("plm-1b"), None)),
            Err(TrainingError::TrainerRootNotProvided)
        ));
        let (model, root) = validate(&request(Some("plm-1b"), Some("/r"))).unwrap();
        assert_eq!(model, "plm-1b");
        assert_eq!(root, PathBuf::from("/r"));
    }

    #[tokio::test]
    async fn test_missing_model_releases_control() {
        let (tx, mut rx) = channel();
        let result = launch_training(request(None, Some("/r")), Settings::default(), tx).await;
        assert!(result.is_err());

        assert_eq!(rx.recv().await, Some(TrainingEvent::Log("No model selected.".into())));
        assert_eq!(
            rx.recv().await,
            Some(TrainingEvent::StateChanged(TrainingState::Idle))
        );
        assert_eq!(rx.recv().await, None);
    }
}
