//! Per-invocation state shared by the subcommands.

use crate::cli::app::GlobalArgs;
use anyhow::{Context as _, Result};
use hifi_install::{Context, InstallerConfig, Layout};
use hifi_platform::{Command, ElevationContext, PlatformProfile, SystemRunner};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;

/// Environment variables forwarded through `sudo` on re-execution.
const FORWARDED_ENV_PREFIXES: &[&str] = &["HIFI_SETUP_", "RUST_LOG"];

pub struct Session {
    pub config: InstallerConfig,
    pub layout: Layout,
    pub profile: PlatformProfile,
    pub runner: SystemRunner,
    pub source_dir: PathBuf,
}

impl Session {
    pub fn open(global: &GlobalArgs, elevation: &ElevationContext) -> Result<Self> {
        let config = resolve_config(global)?;
        let layout = Layout::new(&config.root);
        let profile = PlatformProfile::detect(elevation, &layout.os_release);
        debug!(%profile, root = %layout.root.display(), "session opened");

        let source_dir = match &config.source_dir {
            Some(dir) => dir.clone(),
            None => installer_dir()?,
        };
        let runner = SystemRunner::new(profile.elevated, config.timeouts.command())
            .context("failed to start process runtime")?;

        Ok(Self {
            config,
            layout,
            profile,
            runner,
            source_dir,
        })
    }

    pub fn context(&self) -> Context<'_> {
        Context::new(&self.profile, &self.layout, self.config.timeouts, &self.runner)
    }
}

/// Flags override the config file, which overrides defaults.
pub fn resolve_config(global: &GlobalArgs) -> Result<InstallerConfig> {
    let mut config = match &global.config {
        Some(path) => InstallerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => InstallerConfig::default(),
    };
    if let Some(root) = &global.root {
        config.root = root.clone();
    }
    if let Some(dir) = &global.source_dir {
        config.source_dir = Some(dir.clone());
    }
    if let Some(secs) = global.command_timeout {
        config.timeouts.command_secs = secs;
    }
    Ok(config)
}

/// Directory this installer was started from.
fn installer_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the installer executable")?;
    exe.parent()
        .map(PathBuf::from)
        .context("installer executable has no parent directory")
}

/// Run this same invocation again through `sudo` and relay its exit status.
pub fn reexec_elevated() -> Result<ExitCode> {
    let exe = std::env::current_exe().context("cannot locate the installer executable")?;
    let mut cmd = Command::path(&exe)
        .args(std::env::args_os().skip(1))
        .elevated()
        .interactive();
    for (key, val) in std::env::vars_os() {
        let forwarded = key
            .to_str()
            .is_some_and(|k| FORWARDED_ENV_PREFIXES.iter().any(|p| k.starts_with(p)));
        if forwarded {
            cmd = cmd.env(key, val);
        }
    }

    let runner = SystemRunner::new(false, Duration::from_secs(0))?;
    let out = cmd.run(&runner).context("failed to re-run through sudo")?;
    Ok(exit_code(out.code))
}

pub fn exit_code(code: Option<i32>) -> ExitCode {
    ExitCode::from(exit_status(code))
}

/// Child status as a process exit byte; signals and out-of-range codes become 1.
fn exit_status(code: Option<i32>) -> u8 {
    code.and_then(|c| u8::try_from(c).ok()).unwrap_or(1)
}
