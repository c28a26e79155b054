//! The install state machine.
//!
//! `Idle → Detect → Provision → [Bootstrap → EnsureToolchain → Build] →
//! InstallService → ConfigureAlias → ApplyInitialState → [Reboot] → Done`,
//! with `Failed` reachable from every working stage.

use crate::bootstrap::{BuildEnvironment, BuildEnvironmentBootstrapper};
use crate::build::SourceBuilder;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::hooks::InstallHook;
use crate::outcome::StepOutcome;
use crate::provision::{ArtifactProvisioner, ArtifactSource};
use crate::reboot;
use crate::service::{ServiceInstaller, ServiceState};
use crate::toolchain::{Toolchain, ToolchainManager};
use hifi_platform::arch::Arch;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    Detect,
    Provision,
    Bootstrap,
    EnsureToolchain,
    Build,
    InstallService,
    ConfigureAlias,
    ApplyInitialState,
    Reboot,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Detect => "detect",
            Self::Provision => "provision",
            Self::Bootstrap => "bootstrap",
            Self::EnsureToolchain => "ensure-toolchain",
            Self::Build => "build",
            Self::InstallService => "install-service",
            Self::ConfigureAlias => "configure-alias",
            Self::ApplyInitialState => "apply-initial-state",
            Self::Reboot => "reboot",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Summary of a successful install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub source: ArtifactSource,
    pub staged: PathBuf,
    pub steps: Vec<(Stage, StepOutcome)>,
    pub state: ServiceState,
}

impl InstallReport {
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.steps.iter().map(|(stage, _)| *stage)
    }

    pub fn outcome(&self, stage: Stage) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, outcome)| outcome)
    }
}

/// Values carried between stages of one run.
#[derive(Default)]
struct RunState {
    source: Option<ArtifactSource>,
    env: BuildEnvironment,
    toolchain: Option<Toolchain>,
    staged: Option<PathBuf>,
    steps: Vec<(Stage, StepOutcome)>,
}

pub struct Installer<'c, 'a> {
    ctx: &'c Context<'a>,
    source_dir: PathBuf,
    arch: Arch,
    reboot: bool,
    hooks: Vec<Box<dyn InstallHook + 'c>>,
}

impl<'c, 'a> Installer<'c, 'a> {
    pub fn new(ctx: &'c Context<'a>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            ctx,
            source_dir: source_dir.into(),
            arch: Arch::detect(),
            reboot: false,
            hooks: Vec::new(),
        }
    }

    /// Architecture a bundled binary must match.
    pub fn arch(mut self, arch: Arch) -> Self {
        self.arch = arch;
        self
    }

    pub fn reboot(mut self, reboot: bool) -> Self {
        self.reboot = reboot;
        self
    }

    pub fn hook<H: InstallHook + 'c>(mut self, hook: H) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Drive the state machine to `Done` or `Failed`.
    pub fn run(&self) -> Result<InstallReport> {
        let mut state = RunState::default();
        let mut stage = Stage::Idle;

        while !stage.is_terminal() {
            if stage != Stage::Idle {
                self.hooks.iter().for_each(|h| h.on_enter(stage));
            }
            match self.advance(stage, &mut state) {
                Ok((outcome, next)) => {
                    if let Some(outcome) = outcome {
                        self.hooks.iter().for_each(|h| h.on_complete(stage, &outcome));
                        state.steps.push((stage, outcome));
                    }
                    stage = next;
                }
                Err(e) => {
                    self.hooks.iter().for_each(|h| h.on_failed(stage, &e));
                    return Err(e);
                }
            }
        }

        let (Some(source), Some(staged)) = (state.source, state.staged) else {
            return Err(Error::Io(std::io::Error::other(
                "install finished without a staged artifact",
            )));
        };
        Ok(InstallReport {
            source,
            staged,
            steps: state.steps,
            state: ServiceState::probe(self.ctx),
        })
    }

    /// Perform one stage and choose the next.
    fn advance(
        &self,
        stage: Stage,
        state: &mut RunState,
    ) -> Result<(Option<StepOutcome>, Stage)> {
        let ctx = self.ctx;
        let provisioner = ArtifactProvisioner::new(&self.source_dir, self.arch);
        let installer = ServiceInstaller::new(ctx);

        Ok(match stage {
            Stage::Idle => (None, Stage::Detect),
            Stage::Detect => (
                Some(StepOutcome::done(ctx.profile.to_string())),
                Stage::Provision,
            ),
            Stage::Provision => {
                let source = provisioner.select()?;
                let (outcome, next) = match &source {
                    ArtifactSource::Precompiled { path } => {
                        state.staged = Some(provisioner.stage(ctx, path)?);
                        (
                            StepOutcome::done(format!("using bundled {}", path.display())),
                            Stage::InstallService,
                        )
                    }
                    ArtifactSource::SourceBuild => {
                        (StepOutcome::done("building from source"), Stage::Bootstrap)
                    }
                };
                state.source = Some(source);
                (Some(outcome), next)
            }
            Stage::Bootstrap => {
                let (env, outcome) = BuildEnvironmentBootstrapper::new(ctx).ensure()?;
                state.env = env;
                (Some(outcome), Stage::EnsureToolchain)
            }
            Stage::EnsureToolchain => {
                let (toolchain, outcome) = ToolchainManager::new(ctx).ensure()?;
                state.toolchain = Some(toolchain);
                (Some(outcome), Stage::Build)
            }
            Stage::Build => {
                let toolchain = state.toolchain.as_ref().ok_or_else(|| {
                    Error::Io(std::io::Error::other("build reached without a toolchain"))
                })?;
                let built = SourceBuilder::new(ctx, &self.source_dir).build(toolchain, &state.env)?;
                let staged = provisioner.stage(ctx, &built)?;
                let outcome = StepOutcome::done(format!("built and staged {}", staged.display()));
                state.staged = Some(staged);
                (Some(outcome), Stage::InstallService)
            }
            Stage::InstallService => {
                let staged = state.staged.as_deref().ok_or_else(|| {
                    Error::Io(std::io::Error::other("no staged artifact to install"))
                })?;
                (Some(installer.install(staged)?), Stage::ConfigureAlias)
            }
            Stage::ConfigureAlias => (Some(installer.configure_alias()?), Stage::ApplyInitialState),
            Stage::ApplyInitialState => {
                let next = if self.reboot { Stage::Reboot } else { Stage::Done };
                (Some(installer.apply()?), next)
            }
            Stage::Reboot => (Some(reboot::request_reboot(ctx)), Stage::Done),
            Stage::Done | Stage::Failed => (None, stage),
        })
    }
}
