//! Registration of the agent as a system service and its global alias.

use crate::context::Context;
use crate::error::{Error, FatalKind, Result};
use crate::guard::WritableRoot;
use crate::layout::SERVICE_UNIT;
use crate::outcome::StepOutcome;
use crate::shell_profile;
use hifi_platform::Command;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Observed state of the installed service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceState {
    pub unit_registered: bool,
    pub enabled: bool,
    pub active: bool,
    pub alias_present: bool,
}

impl ServiceState {
    pub fn probe(ctx: &Context<'_>) -> Self {
        Self {
            unit_registered: ctx.layout.system_unit.is_file(),
            enabled: systemctl_query(ctx, "is-enabled"),
            active: systemctl_query(ctx, "is-active"),
            alias_present: hifi_fs::link_exists(&ctx.layout.alias),
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |b: bool| if b { "yes" } else { "no" };
        write!(
            f,
            "unit registered: {}, enabled: {}, active: {}, alias: {}",
            flag(self.unit_registered),
            flag(self.enabled),
            flag(self.active),
            flag(self.alias_present)
        )
    }
}

/// `systemctl <query> --quiet hifi-wifi.service`, false on any failure.
pub(crate) fn systemctl_query(ctx: &Context<'_>, query: &str) -> bool {
    Command::new("systemctl")
        .args([query, "--quiet", SERVICE_UNIT])
        .timeout(ctx.timeouts.command())
        .run(ctx.runner)
        .is_ok_and(|out| out.success())
}

pub struct ServiceInstaller<'c, 'a> {
    ctx: &'c Context<'a>,
}

impl<'c, 'a> ServiceInstaller<'c, 'a> {
    pub fn new(ctx: &'c Context<'a>) -> Self {
        Self { ctx }
    }

    /// Stop a running instance, register the service and relabel it.
    pub fn install(&self, staged: &Path) -> Result<StepOutcome> {
        let mut steps = vec![self.stop_if_active()?];

        let cmd = Command::path(staged)
            .arg("install")
            .elevated()
            .timeout(self.ctx.timeouts.long_running());
        info!(artifact = %staged.display(), "registering service");
        let out = cmd.run(self.ctx.runner).map_err(|e| {
            Error::fatal(FatalKind::ServiceInstallFailed, format!("`{}`: {e}", cmd.line()))
        })?;
        if !out.success() {
            return Err(Error::fatal(
                FatalKind::ServiceInstallFailed,
                format!("`{}` exited with {:?}: {}", cmd.line(), out.code, out.stderr.trim()),
            ));
        }
        steps.push(StepOutcome::done("service installed"));
        steps.push(self.relabel());
        Ok(StepOutcome::merge(steps))
    }

    /// The binary of a running service is never replaced.
    fn stop_if_active(&self) -> Result<StepOutcome> {
        if !systemctl_query(self.ctx, "is-active") {
            return Ok(StepOutcome::ignored("service not running"));
        }
        let stopped = self
            .ctx
            .elevated("systemctl")
            .args(["stop", SERVICE_UNIT])
            .run(self.ctx.runner)
            .is_ok_and(|out| out.success());
        if stopped || !systemctl_query(self.ctx, "is-active") {
            return Ok(StepOutcome::done("stopped running service"));
        }
        Err(Error::fatal(
            FatalKind::ServiceInstallFailed,
            format!("{SERVICE_UNIT} is still running and could not be stopped"),
        ))
    }

    /// Give the installed binary an executable SELinux label.
    fn relabel(&self) -> StepOutcome {
        if !self.ctx.layout.selinux_enforce.exists() {
            return StepOutcome::ignored("SELinux not present");
        }
        let target = &self.ctx.layout.installed_binary;
        let attempts = [
            self.ctx.elevated("restorecon").arg("-v").arg(target),
            self.ctx
                .elevated("chcon")
                .args(["-t", "bin_t"])
                .arg(target),
        ];
        for cmd in attempts {
            match cmd.run(self.ctx.runner) {
                Ok(out) if out.success() => {
                    return StepOutcome::done(format!("relabelled with {}", cmd.get_program()));
                }
                Ok(out) => debug!(cmd = %cmd.line(), code = ?out.code, "relabel failed"),
                Err(e) => debug!(cmd = %cmd.line(), error = %e, "relabel failed"),
            }
        }
        warn!(binary = %target.display(), "could not relabel for SELinux, continuing");
        StepOutcome::ignored("SELinux relabel failed")
    }

    /// Link `/usr/local/bin/hifi-wifi` to the installed binary, falling back to
    /// a `PATH` export when the link cannot be made.
    pub fn configure_alias(&self) -> Result<StepOutcome> {
        let layout = self.ctx.layout;
        if hifi_fs::link_exists(&layout.alias) {
            return Ok(StepOutcome::ignored(format!(
                "{} already exists",
                layout.alias.display()
            )));
        }

        let linked = {
            let _rw = WritableRoot::acquire(self.ctx);
            create_alias(&layout.installed_binary, &layout.alias)
        };

        match linked {
            Ok(()) => {
                info!(alias = %layout.alias.display(), "created command alias");
                Ok(StepOutcome::done(format!("linked {}", layout.alias.display())))
            }
            Err(e) => {
                warn!(error = %e, "could not create alias, exporting PATH instead");
                shell_profile::append_export(self.ctx)
            }
        }
    }

    /// Run the agent's `apply` through the alias when it resolves, otherwise
    /// through the installed path.
    pub fn apply(&self) -> Result<StepOutcome> {
        let program = self.resolve_command();
        let cmd = Command::path(&program)
            .arg("apply")
            .elevated()
            .timeout(self.ctx.timeouts.command());
        let out = cmd.run(self.ctx.runner).map_err(|e| {
            Error::fatal(FatalKind::ApplyFailed, format!("`{}`: {e}", cmd.line()))
        })?;
        if !out.success() {
            return Err(Error::fatal(
                FatalKind::ApplyFailed,
                format!("`{}` exited with {:?}: {}", cmd.line(), out.code, out.stderr.trim()),
            ));
        }
        Ok(StepOutcome::done(format!("applied via {}", program.display())))
    }

    pub fn resolve_command(&self) -> PathBuf {
        let layout = self.ctx.layout;
        let on_path = layout
            .alias
            .parent()
            .is_some_and(|dir| self.ctx.search_path().contains(dir));
        if on_path && layout.alias.is_file() {
            layout.alias.clone()
        } else {
            layout.installed_binary.clone()
        }
    }
}

fn create_alias(target: &Path, alias: &Path) -> Result<()> {
    if let Some(dir) = alias.parent() {
        std::fs::create_dir_all(dir)?;
    }
    hifi_fs::symlink(target, alias)?;
    Ok(())
}
