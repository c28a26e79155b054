//! Teardown of everything an install may have left behind.
//!
//! Steps are independent: each checks for its target before acting, treats
//! absence as success, and a failing step does not stop the ones after it.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::guard::WritableRoot;
use crate::layout::{REPAIR_UNIT, SERVICE_UNIT};
use crate::network;
use crate::outcome::StepOutcome;
use crate::service::systemctl_query;
use crate::shell_profile;
use hifi_fs::Removal;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReversalStep {
    StopService,
    RemoveSystemUnit,
    RemoveUserRepair,
    RemoveInstallRoot,
    StripShellExports,
    PurgeConfig,
    RemoveDriverConfigs,
    DetachQdiscs,
    RemoveAlias,
}

impl fmt::Display for ReversalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StopService => "stop service",
            Self::RemoveSystemUnit => "remove system unit",
            Self::RemoveUserRepair => "remove repair unit and polkit rule",
            Self::RemoveInstallRoot => "remove install directory",
            Self::StripShellExports => "clean shell profiles",
            Self::PurgeConfig => "remove configuration",
            Self::RemoveDriverConfigs => "remove driver and sysctl configs",
            Self::DetachQdiscs => "detach qdiscs",
            Self::RemoveAlias => "remove command alias",
        };
        f.write_str(name)
    }
}

/// Ordered teardown steps for one uninstall run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallPlan {
    steps: Vec<ReversalStep>,
}

impl UninstallPlan {
    /// The fixed sequence; configuration is only removed on `purge`.
    pub fn new(purge: bool) -> Self {
        use ReversalStep::*;
        let mut steps = vec![
            StopService,
            RemoveSystemUnit,
            RemoveUserRepair,
            RemoveInstallRoot,
            StripShellExports,
        ];
        if purge {
            steps.push(PurgeConfig);
        }
        steps.extend([RemoveDriverConfigs, DetachQdiscs, RemoveAlias]);
        Self { steps }
    }

    pub fn steps(&self) -> &[ReversalStep] {
        &self.steps
    }
}

pub struct StepReport {
    pub step: ReversalStep,
    pub result: Result<StepOutcome>,
}

#[derive(Default)]
pub struct UninstallReport {
    pub steps: Vec<StepReport>,
}

impl UninstallReport {
    pub fn failures(&self) -> impl Iterator<Item = (ReversalStep, &Error)> {
        self.steps
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.step, e)))
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn outcome(&self, step: ReversalStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|r| r.step == step)
            .and_then(|r| r.result.as_ref().ok())
    }
}

pub struct ReversalOrchestrator<'c, 'a> {
    ctx: &'c Context<'a>,
}

impl<'c, 'a> ReversalOrchestrator<'c, 'a> {
    pub fn new(ctx: &'c Context<'a>) -> Self {
        Self { ctx }
    }

    pub fn execute(&self, plan: &UninstallPlan) -> UninstallReport {
        let mut report = UninstallReport::default();
        for &step in plan.steps() {
            let result = self.run_step(step);
            match &result {
                Ok(outcome) => info!(%step, %outcome),
                Err(e) => warn!(%step, error = %e, "step failed, continuing"),
            }
            report.steps.push(StepReport { step, result });
        }
        report
    }

    fn run_step(&self, step: ReversalStep) -> Result<StepOutcome> {
        let layout = self.ctx.layout;
        match step {
            ReversalStep::StopService => Ok(self.stop_service()),
            ReversalStep::RemoveSystemUnit => self.remove_system_unit(),
            ReversalStep::RemoveUserRepair => self.remove_user_repair(),
            ReversalStep::RemoveInstallRoot => remove(&layout.install_dir),
            ReversalStep::StripShellExports => shell_profile::strip_exports(self.ctx),
            ReversalStep::PurgeConfig => remove(&layout.config_dir),
            ReversalStep::RemoveDriverConfigs => settle(
                layout
                    .modprobe_confs()
                    .chain(std::iter::once(layout.sysctl_conf.clone()))
                    .map(|path| remove(&path)),
            ),
            ReversalStep::DetachQdiscs => network::detach_qdiscs(self.ctx),
            ReversalStep::RemoveAlias => self.remove_alias(),
        }
    }

    fn stop_service(&self) -> StepOutcome {
        let mut outcomes = Vec::new();
        for (query, action) in [("is-active", "stop"), ("is-enabled", "disable")] {
            if !systemctl_query(self.ctx, query) {
                outcomes.push(StepOutcome::ignored(format!("{SERVICE_UNIT} not {query}")));
                continue;
            }
            let cmd = self.ctx.elevated("systemctl").args([action, SERVICE_UNIT]);
            outcomes.push(run_tolerant(self.ctx, &cmd, format!("{action} {SERVICE_UNIT}")));
        }
        StepOutcome::merge(outcomes)
    }

    fn remove_system_unit(&self) -> Result<StepOutcome> {
        let outcome = remove(&self.ctx.layout.system_unit)?;
        if !outcome.is_done() {
            return Ok(outcome);
        }
        let reload = self.ctx.elevated("systemctl").arg("daemon-reload");
        Ok(StepOutcome::merge([
            outcome,
            run_tolerant(self.ctx, &reload, "daemon-reload"),
        ]))
    }

    fn remove_user_repair(&self) -> Result<StepOutcome> {
        let layout = self.ctx.layout;
        let user = self.ctx.user();
        let mut results = Vec::new();

        let unit = layout.user_repair_unit(&user.home);
        if unit.exists() {
            let disable = self
                .ctx
                .user_systemctl()
                .args(["disable", "--now", REPAIR_UNIT]);
            results.push(Ok(run_tolerant(self.ctx, &disable, format!("disable {REPAIR_UNIT}"))));
            results.push(remove(&unit));
            let reload = self.ctx.user_systemctl().arg("daemon-reload");
            results.push(Ok(run_tolerant(self.ctx, &reload, "user daemon-reload")));
        } else {
            results.push(Ok(StepOutcome::ignored(format!("{REPAIR_UNIT} absent"))));
        }

        results.push(remove(&layout.polkit_rule));

        if layout.linger_dir.join(&user.name).exists() {
            let revoke = self
                .ctx
                .elevated("loginctl")
                .args(["disable-linger", user.name.as_str()]);
            results.push(Ok(run_tolerant(
                self.ctx,
                &revoke,
                format!("disable linger for {}", user.name),
            )));
        } else {
            results.push(Ok(StepOutcome::ignored("lingering not enabled")));
        }
        settle(results)
    }

    fn remove_alias(&self) -> Result<StepOutcome> {
        let alias = &self.ctx.layout.alias;
        match alias.symlink_metadata() {
            Err(_) => return Ok(StepOutcome::ignored(format!("{} absent", alias.display()))),
            Ok(meta) if !meta.file_type().is_symlink() => {
                return Ok(StepOutcome::ignored(format!(
                    "{} is not a link, leaving it",
                    alias.display()
                )));
            }
            Ok(_) => {}
        }
        let _rw = WritableRoot::acquire(self.ctx);
        remove(alias)
    }
}

fn remove(path: &Path) -> Result<StepOutcome> {
    Ok(match hifi_fs::remove_path(path)? {
        Removal::Removed => StepOutcome::done(format!("removed {}", path.display())),
        Removal::Absent => StepOutcome::ignored(format!("{} absent", path.display())),
    })
}

/// Drive every sub-step to completion; the first error is reported only
/// after all of them ran.
fn settle(results: impl IntoIterator<Item = Result<StepOutcome>>) -> Result<StepOutcome> {
    let mut outcomes = Vec::new();
    let mut first_err = None;
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                warn!(error = %e, "removal failed, continuing with the rest");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(StepOutcome::merge(outcomes)),
    }
}

/// Run a state-changing command whose failure only means the target was
/// already in the wanted state.
fn run_tolerant(
    ctx: &Context<'_>,
    cmd: &hifi_platform::Command,
    what: impl Into<String>,
) -> StepOutcome {
    let what = what.into();
    match cmd.run(ctx.runner) {
        Ok(out) if out.success() => StepOutcome::done(what),
        Ok(out) => {
            warn!(cmd = %cmd.line(), code = ?out.code, "command refused");
            StepOutcome::ignored(format!("{what}: exit {:?}", out.code))
        }
        Err(e) => {
            warn!(cmd = %cmd.line(), error = %e, "command failed");
            StepOutcome::ignored(format!("{what}: {e}"))
        }
    }
}
