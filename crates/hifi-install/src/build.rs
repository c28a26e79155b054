//! Source build of the agent as the acting user.

use crate::bootstrap::BuildEnvironment;
use crate::context::Context;
use crate::error::{Error, FatalKind, Result};
use crate::layout::BINARY_NAME;
use crate::toolchain::Toolchain;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct SourceBuilder<'c, 'a> {
    ctx: &'c Context<'a>,
    source_dir: &'c Path,
}

impl<'c, 'a> SourceBuilder<'c, 'a> {
    pub fn new(ctx: &'c Context<'a>, source_dir: &'c Path) -> Self {
        Self { ctx, source_dir }
    }

    pub fn output(&self) -> PathBuf {
        self.source_dir
            .join("target")
            .join("release")
            .join(BINARY_NAME)
    }

    /// Run `cargo build --release` and return the produced binary.
    pub fn build(&self, toolchain: &Toolchain, env: &BuildEnvironment) -> Result<PathBuf> {
        let mut cmd = self
            .ctx
            .as_user(toolchain.cargo.to_string_lossy())
            .args(["build", "--release"])
            .current_dir(self.source_dir)
            .timeout(self.ctx.timeouts.long_running());
        if let Some(cc) = &env.cc {
            cmd = cmd.env("CC", cc);
        }
        if let Some(cxx) = &env.cxx {
            cmd = cmd.env("CXX", cxx);
        }

        info!(dir = %self.source_dir.display(), "building hifi-wifi");
        let out = cmd.run(self.ctx.runner).map_err(|e| {
            Error::fatal(FatalKind::BuildFailed, format!("`{}`: {e}", cmd.line()))
        })?;
        if !out.success() {
            return Err(Error::fatal(
                FatalKind::BuildFailed,
                format!("cargo exited with {:?}: {}", out.code, last_lines(&out.stderr, 20)),
            ));
        }

        let output = self.output();
        if !output.is_file() {
            return Err(Error::fatal(
                FatalKind::BuildFailed,
                format!("build succeeded but {} was not produced", output.display()),
            ));
        }
        Ok(output)
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}
