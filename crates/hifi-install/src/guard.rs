//! Scoped write access to a read-only root filesystem.

use crate::context::Context;
use hifi_platform::{Command, CommandRunner};
use std::time::Duration;
use tracing::{debug, warn};

const TOGGLE: &str = "steamos-readonly";

/// Disables root read-only protection on creation and re-enables it on drop.
///
/// Success means both toggles were attempted; exit statuses are only logged.
pub struct WritableRoot<'a> {
    runner: &'a dyn CommandRunner,
    timeout: Duration,
}

impl<'a> WritableRoot<'a> {
    /// Open the window on immutable hosts; `None` elsewhere.
    pub fn acquire(ctx: &Context<'a>) -> Option<Self> {
        if !ctx.profile.is_immutable {
            return None;
        }
        let guard = Self {
            runner: ctx.runner,
            timeout: ctx.timeouts.command(),
        };
        guard.toggle("disable");
        Some(guard)
    }

    fn toggle(&self, action: &str) {
        let cmd = Command::new(TOGGLE)
            .arg(action)
            .elevated()
            .timeout(self.timeout);
        match cmd.run(self.runner) {
            Ok(out) if out.success() => debug!(action, "root filesystem toggled"),
            Ok(out) => warn!(action, code = ?out.code, "{TOGGLE} exited non-zero"),
            Err(hifi_platform::Error::CommandNotFound { .. }) => {
                debug!(action, "{TOGGLE} not available")
            }
            Err(e) => warn!(action, error = %e, "{TOGGLE} failed"),
        }
    }
}

impl Drop for WritableRoot<'_> {
    fn drop(&mut self) {
        self.toggle("enable");
    }
}
