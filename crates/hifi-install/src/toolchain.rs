//! User-level Rust toolchain with a single self-repair attempt.

use crate::context::Context;
use crate::error::{Error, FatalKind, Result};
use crate::outcome::StepOutcome;
use std::path::PathBuf;
use tracing::{info, warn};

const RUSTUP_INSTALL: &str =
    "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y";

/// A verified `cargo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub cargo: PathBuf,
}

pub struct ToolchainManager<'c, 'a> {
    ctx: &'c Context<'a>,
}

impl<'c, 'a> ToolchainManager<'c, 'a> {
    pub fn new(ctx: &'c Context<'a>) -> Self {
        Self { ctx }
    }

    /// `~/.cargo/bin/<tool>` first, then the search path.
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        let local = self.ctx.cargo_bin().join(tool);
        if local.is_file() {
            return Some(local);
        }
        self.ctx.search_path().find(tool)
    }

    fn works(&self, cargo: &std::path::Path) -> bool {
        self.ctx
            .as_user(cargo.to_string_lossy())
            .arg("--version")
            .run(self.ctx.runner)
            .is_ok_and(|out| out.success())
    }

    pub fn ensure(&self) -> Result<(Toolchain, StepOutcome)> {
        let mut done = Vec::new();

        let cargo = match self.locate("cargo") {
            Some(cargo) => cargo,
            None => {
                self.install_rustup()?;
                done.push("installed rustup".to_string());
                self.ctx.cargo_bin().join("cargo")
            }
        };

        if !self.works(&cargo) {
            warn!(cargo = %cargo.display(), "cargo does not run, repairing toolchain");
            self.repair();
            if !self.works(&cargo) {
                return Err(Error::fatal(
                    FatalKind::ToolchainUnrepairable,
                    format!("{} --version still fails after repair", cargo.display()),
                ));
            }
            done.push("repaired toolchain".to_string());
        }

        let outcome = if done.is_empty() {
            StepOutcome::ignored(format!("cargo works at {}", cargo.display()))
        } else {
            StepOutcome::done(done.join("; "))
        };
        Ok((Toolchain { cargo }, outcome))
    }

    fn install_rustup(&self) -> Result<()> {
        if self.ctx.search_path().find("curl").is_none() {
            return Err(Error::fatal(
                FatalKind::FetchToolMissing,
                "curl is required to install rustup",
            ));
        }
        info!("installing rustup for {}", self.ctx.user().name);
        let out = self
            .ctx
            .as_user("sh")
            .args(["-c", RUSTUP_INSTALL])
            .timeout(self.ctx.timeouts.long_running())
            .run(self.ctx.runner)?;
        if !out.success() {
            warn!(code = ?out.code, stderr = %out.stderr.trim(), "rustup installer failed");
        }
        Ok(())
    }

    /// `rustup self update` then `rustup default stable`; results are only
    /// judged by the re-probe that follows.
    fn repair(&self) {
        let rustup = self
            .locate("rustup")
            .unwrap_or_else(|| self.ctx.cargo_bin().join("rustup"));
        for args in [["self", "update"], ["default", "stable"]] {
            let cmd = self
                .ctx
                .as_user(rustup.to_string_lossy())
                .args(args)
                .timeout(self.ctx.timeouts.long_running());
            match cmd.run(self.ctx.runner) {
                Ok(out) if out.success() => {}
                Ok(out) => warn!(cmd = %cmd.line(), code = ?out.code, "repair step failed"),
                Err(e) => warn!(cmd = %cmd.line(), error = %e, "repair step failed"),
            }
        }
    }
}
