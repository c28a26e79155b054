//! Choice between a bundled binary and a source build.

use crate::context::Context;
use crate::error::{Error, FatalKind, Result};
use crate::layout::{BINARY_NAME, Layout};
use hifi_fs::{AtomicWriteOptions, Ownership, PermissionMode};
use hifi_platform::arch::Arch;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Provisioning path chosen for one install run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// A bundled binary whose architecture matches the host.
    Precompiled { path: PathBuf },
    SourceBuild,
}

pub struct ArtifactProvisioner<'a> {
    source_dir: &'a Path,
    arch: Arch,
}

impl<'a> ArtifactProvisioner<'a> {
    pub fn new(source_dir: &'a Path, arch: Arch) -> Self {
        Self { source_dir, arch }
    }

    /// Bundled binary locations, in preference order.
    pub fn candidates(&self) -> [PathBuf; 2] {
        [
            Layout::staged_binary(self.source_dir),
            self.source_dir.join(BINARY_NAME),
        ]
    }

    /// Pick the provisioning path. A bundled binary for the wrong machine is
    /// fatal rather than a reason to fall back to building.
    pub fn select(&self) -> Result<ArtifactSource> {
        let Some(path) = self.candidates().into_iter().find(|p| p.is_file()) else {
            info!(dir = %self.source_dir.display(), "no bundled binary, building from source");
            return Ok(ArtifactSource::SourceBuild);
        };

        let found = Arch::of_executable(&path).map_err(|e| match e {
            hifi_platform::Error::NotElf { .. } => Error::fatal(FatalKind::NotElf, e.to_string()),
            other => Error::Platform(other),
        })?;
        // an unrecognised machine tag cannot be verified against anything
        if found == Arch::Unknown || found != self.arch {
            return Err(Error::fatal(
                FatalKind::ArchMismatch,
                format!(
                    "{} is built for {found}, this machine is {}",
                    path.display(),
                    self.arch
                ),
            ));
        }

        debug!(path = %path.display(), arch = %found, "bundled binary accepted");
        Ok(ArtifactSource::Precompiled { path })
    }

    /// Put an accepted artifact at the staging location, executable and owned
    /// by the acting user.
    pub fn stage(&self, ctx: &Context<'_>, artifact: &Path) -> Result<PathBuf> {
        let staged = Layout::staged_binary(self.source_dir);
        let owner = ctx
            .profile
            .elevated
            .then(|| Ownership::new(ctx.user().uid, ctx.user().gid));

        if artifact != staged {
            if let Some(dir) = staged.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let mut options = AtomicWriteOptions::new().permissions(PermissionMode::Executable);
            if let Some(owner) = owner {
                options = options.owner(owner);
            }
            hifi_fs::atomic_copy(artifact, &staged, options)?;
            info!(from = %artifact.display(), to = %staged.display(), "staged artifact");
        } else {
            PermissionMode::Executable.apply_to_path(&staged)?;
            if let Some(owner) = owner {
                owner.apply_to_path(&staged)?;
            }
        }
        Ok(staged)
    }
}
