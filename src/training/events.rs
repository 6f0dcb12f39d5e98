// Worker -> UI messages
//
// The training worker never touches UI state; it only sends these.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Phase of the training control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    /// Start button enabled, no progress indicator
    Idle,
    /// Dataset, config and registry being prepared
    Preparing,
    /// Trainer subprocess running
    Running,
}

/// How the trainer process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Staging directory used for this run
    pub staging_dir: PathBuf,
    /// Manifest entries written
    pub entries: usize,
    /// Exit code (None when killed by a signal)
    pub exit_code: Option<i32>,
    /// Whether the trainer reported success
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Event sent from the training worker to the dispatch loop
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingEvent {
    /// One line for the log widget
    Log(String),
    /// Control state transition
    StateChanged(TrainingState),
    /// Trainer exited (any status)
    Finished(RunSummary),
}

pub type EventSender = mpsc::UnboundedSender<TrainingEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TrainingEvent>;

/// Create the worker -> UI channel
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send a log line; a closed receiver is not an error for the worker
pub(crate) fn log(events: &EventSender, message: impl Into<String>) {
    let _ = events.send(TrainingEvent::Log(message.into()));
}

pub(crate) fn state(events: &EventSender, state: TrainingState) {
    let _ = events.send(TrainingEvent::StateChanged(state));
}
