//! Compiler provisioning for source builds.
//!
//! Immutable hosts get Homebrew under `/home/linuxbrew/.linuxbrew`, which
//! lives outside the protected root and survives OS image updates. Mutable
//! hosts use the distribution package manager, and only when no compiler is
//! already on the search path.

use crate::context::Context;
use crate::error::{Error, FatalKind, Result};
use crate::outcome::StepOutcome;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const HOMEBREW_INSTALLER: &str =
    "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";

/// Where the compiler for a source build comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnvironment {
    pub cc: Option<PathBuf>,
    pub cxx: Option<PathBuf>,
    /// Package manager prefix, when one was bootstrapped.
    pub prefix: Option<PathBuf>,
    /// Survives an OS reset or image update.
    pub persistent: bool,
}

pub struct BuildEnvironmentBootstrapper<'c, 'a> {
    ctx: &'c Context<'a>,
}

impl<'c, 'a> BuildEnvironmentBootstrapper<'c, 'a> {
    pub fn new(ctx: &'c Context<'a>) -> Self {
        Self { ctx }
    }

    pub fn ensure(&self) -> Result<(BuildEnvironment, StepOutcome)> {
        if self.ctx.profile.is_immutable {
            self.ensure_homebrew()
        } else {
            Ok(self.ensure_system_compiler())
        }
    }

    fn brew(&self) -> PathBuf {
        self.ctx.layout.brew_bin().join("brew")
    }

    fn probe(&self, program: &Path) -> bool {
        self.ctx
            .as_user(program.to_string_lossy())
            .arg("--version")
            .run(self.ctx.runner)
            .is_ok_and(|out| out.success())
    }

    fn ensure_homebrew(&self) -> Result<(BuildEnvironment, StepOutcome)> {
        let prefix = self.ctx.layout.brew_prefix.clone();
        let mut done = Vec::new();

        let brew = self.brew();
        if brew.is_file() && self.probe(&brew) {
            debug!(prefix = %prefix.display(), "homebrew already present");
        } else {
            self.install_homebrew()?;
            done.push(format!("installed homebrew under {}", prefix.display()));
        }

        let compiler = match self.working_versioned_gcc() {
            Some(found) => found,
            None => {
                info!("installing gcc through homebrew");
                let out = self
                    .ctx
                    .as_user(brew.to_string_lossy())
                    .args(["install", "gcc"])
                    .env("HOMEBREW_NO_AUTO_UPDATE", "1")
                    .timeout(self.ctx.timeouts.long_running())
                    .run(self.ctx.runner)?;
                if !out.success() {
                    // brew reports post-install link warnings as failures
                    debug!(code = ?out.code, "brew install gcc exited non-zero, probing anyway");
                }
                let found = self.working_versioned_gcc().ok_or_else(|| {
                    Error::fatal(
                        FatalKind::BootstrapFailed,
                        format!("no working gcc-<N> under {}", self.ctx.layout.brew_bin().display()),
                    )
                })?;
                done.push(format!("installed {}", found.0.display()));
                found
            }
        };

        let env = BuildEnvironment {
            cc: Some(compiler.0),
            cxx: compiler.1,
            prefix: Some(prefix),
            persistent: true,
        };
        let outcome = if done.is_empty() {
            StepOutcome::ignored("build environment already provisioned")
        } else {
            StepOutcome::done(done.join("; "))
        };
        Ok((env, outcome))
    }

    fn install_homebrew(&self) -> Result<()> {
        let layout = self.ctx.layout;
        let user = self.ctx.user();
        info!(prefix = %layout.brew_prefix.display(), "installing homebrew");

        let owner = format!("{}:{}", user.uid, user.gid);
        let elevated_steps = [
            self.ctx
                .elevated("mkdir")
                .arg("-p")
                .arg(&layout.brew_prefix),
            self.ctx
                .elevated("chown")
                .args(["-R", owner.as_str()])
                .arg(&layout.brew_root),
        ];
        for cmd in elevated_steps {
            let out = cmd.run(self.ctx.runner)?;
            if !out.success() {
                return Err(Error::fatal(
                    FatalKind::BootstrapFailed,
                    format!("`{}` failed: {}", cmd.line(), out.stderr.trim()),
                ));
            }
        }

        let script = format!("curl -fsSL {HOMEBREW_INSTALLER} | /bin/bash");
        let out = self
            .ctx
            .as_user("/bin/bash")
            .args(["-c", script.as_str()])
            .env("NONINTERACTIVE", "1")
            .timeout(self.ctx.timeouts.long_running())
            .run(self.ctx.runner)?;

        if !self.probe(&self.brew()) {
            return Err(Error::fatal(
                FatalKind::BootstrapFailed,
                format!(
                    "homebrew installer exited with {:?} and brew does not run: {}",
                    out.code,
                    out.stderr.trim()
                ),
            ));
        }
        Ok(())
    }

    /// Highest `gcc-<N>` under the prefix that answers `--version`, with its
    /// matching `g++-<N>` when present.
    fn working_versioned_gcc(&self) -> Option<(PathBuf, Option<PathBuf>)> {
        let bin = self.ctx.layout.brew_bin();
        let (version, gcc) = versioned_compilers(&bin, "gcc-").into_iter().next()?;
        if !self.probe(&gcc) {
            warn!(compiler = %gcc.display(), "versioned gcc does not run");
            return None;
        }
        let gxx = bin.join(format!("g++-{version}"));
        Some((gcc, gxx.is_file().then_some(gxx)))
    }

    fn ensure_system_compiler(&self) -> (BuildEnvironment, StepOutcome) {
        if let Some(cc) = self.find_system_compiler() {
            return (
                BuildEnvironment {
                    cc: Some(cc.clone()),
                    ..BuildEnvironment::default()
                },
                StepOutcome::ignored(format!("compiler present at {}", cc.display())),
            );
        }

        let Some((program, args)) = self.ctx.profile.distro.compiler_package_command() else {
            warn!(distro = %self.ctx.profile.distro_id, "no compiler and no known package manager");
            return (
                BuildEnvironment::default(),
                StepOutcome::ignored("no known package manager for this distribution"),
            );
        };

        info!(package_manager = program, "installing a C compiler");
        let cmd = self
            .ctx
            .elevated(program)
            .args(args)
            .timeout(self.ctx.timeouts.long_running());
        match cmd.run(self.ctx.runner) {
            Ok(out) if !out.success() => {
                warn!(cmd = %cmd.line(), code = ?out.code, "package install failed")
            }
            Err(e) => warn!(cmd = %cmd.line(), error = %e, "package install failed"),
            Ok(_) => {}
        }

        match self.find_system_compiler() {
            Some(cc) => (
                BuildEnvironment {
                    cc: Some(cc.clone()),
                    ..BuildEnvironment::default()
                },
                StepOutcome::done(format!("installed compiler {}", cc.display())),
            ),
            None => (
                BuildEnvironment::default(),
                StepOutcome::ignored("compiler still missing after package install"),
            ),
        }
    }

    fn find_system_compiler(&self) -> Option<PathBuf> {
        let path = self.ctx.search_path();
        path.find("cc").or_else(|| path.find("gcc"))
    }
}

/// `<prefix><N>` executables in `dir`, highest `N` first.
fn versioned_compilers(dir: &Path, prefix: &str) -> Vec<(u32, PathBuf)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let name = entry.file_name();
            let version = name.to_str()?.strip_prefix(prefix)?.parse().ok()?;
            Some((version, entry.path()))
        })
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0));
    found
}
