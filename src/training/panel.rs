// Training panel - UI-owned state for the "Start Training" control
//
// State machine: Idle -> Preparing -> Running -> Idle. Only the dispatch loop
// mutates the panel, by calling `try_begin` and applying worker events.

use super::events::{RunSummary, TrainingEvent, TrainingState};
use crate::errors::TrainingError;

/// Start button, progress indicator and log widget
#[derive(Debug)]
pub struct TrainingPanel {
    state: TrainingState,
    log: Vec<String>,
    last_run: Option<RunSummary>,
}

impl TrainingPanel {
    pub fn new() -> Self {
        Self {
            state: TrainingState::Idle,
            log: Vec::new(),
            last_run: None,
        }
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// Start button enabled
    pub fn start_enabled(&self) -> bool {
        self.state == TrainingState::Idle
    }

    /// Progress indicator spinning
    pub fn progress_active(&self) -> bool {
        self.state != TrainingState::Idle
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn last_run(&self) -> Option<&RunSummary> {
        self.last_run.as_ref()
    }

    /// Claim the control for a new run (Idle -> Preparing)
    pub fn try_begin(&mut self) -> Result<(), TrainingError> {
        if !self.start_enabled() {
            return Err(TrainingError::AlreadyRunning);
        }
        self.state = TrainingState::Preparing;
        Ok(())
    }

    /// Apply one worker event
    pub fn apply(&mut self, event: TrainingEvent) {
        match event {
            TrainingEvent::Log(line) => self.log.push(line),
            TrainingEvent::StateChanged(state) => {
                tracing::debug!(from = ?self.state, to = ?state, "Training state changed");
                self.state = state;
            }
            TrainingEvent::Finished(summary) => self.last_run = Some(summary),
        }
    }
}

impl Default for TrainingPanel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let panel = TrainingPanel::new();
        assert_eq!(panel.state(), TrainingState::Idle);
        assert!(panel.start_enabled());
        assert!(!panel.progress_active());
    }

    #[test]
    fn test_second_begin_refused_while_active() {
        let mut panel = TrainingPanel::new();
        panel.try_begin().unwrap();
        assert!(!panel.start_enabled());
        assert!(panel.progress_active());
        assert!(matches!(panel.try_begin(), Err(TrainingError::AlreadyRunning)));

        panel.apply(TrainingEvent::StateChanged(TrainingState::Running));
        assert!(panel.try_begin().is_err());

        panel.apply(TrainingEvent::StateChanged(TrainingState::Idle));
        assert!(panel.start_enabled());
        assert!(panel.try_begin().is_ok());
    }

    #[test]
    fn test_log_lines_kept_in_order() {
        let mut panel = TrainingPanel::new();
        panel.apply(TrainingEvent::Log("one".into()));
        panel.apply(TrainingEvent::Log("two".into()));
        assert_eq!(panel.log(), ["one", "two"]);
    }
}
