//! Observers of install stage transitions.

use crate::error::Error;
use crate::outcome::StepOutcome;
use crate::pipeline::Stage;
use tracing::{error, info};

/// Hook trait for install lifecycle events.
/// Implement this to surface progress without touching the state machine.
pub trait InstallHook {
    /// Called when a stage starts.
    fn on_enter(&self, _stage: Stage) {}

    /// Called when a stage finishes without a fatal error.
    fn on_complete(&self, _stage: Stage, _outcome: &StepOutcome) {}

    /// Called once when the run enters `Failed`.
    fn on_failed(&self, _stage: Stage, _error: &Error) {}
}

/// Logs every transition through `tracing`.
pub struct TracingHook;

impl InstallHook for TracingHook {
    fn on_enter(&self, stage: Stage) {
        info!(%stage, "entering stage");
    }

    fn on_complete(&self, stage: Stage, outcome: &StepOutcome) {
        info!(%stage, %outcome, "stage finished");
    }

    fn on_failed(&self, stage: Stage, error: &Error) {
        error!(%stage, %error, "install failed");
    }
}
