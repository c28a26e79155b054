use crate::{Error, Result};
use nix::unistd::{Gid, Uid};
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

/// File permission modes the installer writes with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PermissionMode {
    /// Keep the mode the file was created with. New files written through a
    /// temporary file start out as `0o600`.
    #[default]
    Inherit,

    /// `0o644`
    ReadWrite,

    /// `0o755`
    Executable,

    /// Explicit mode bits.
    Custom(u32),
}

impl PermissionMode {
    pub fn mode(self) -> Option<u32> {
        match self {
            Self::Inherit => None,
            Self::ReadWrite => Some(0o644),
            Self::Executable => Some(0o755),
            Self::Custom(mode) => Some(mode),
        }
    }

    /// Apply the permission mode to a file or directory path.
    pub fn apply_to_path(self, path: &Path) -> Result<()> {
        let Some(mode) = self.mode() else {
            return Ok(());
        };
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| Error::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Numeric owner and group of a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    pub fn of(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::new(meta.uid(), meta.gid()))
    }

    /// Change ownership; a no-op when it already matches.
    pub fn apply_to_path(self, path: &Path) -> Result<()> {
        if Self::of(path).is_ok_and(|current| current == self) {
            return Ok(());
        }
        nix::unistd::chown(path, Some(Uid::from_raw(self.uid)), Some(Gid::from_raw(self.gid)))
            .map_err(|e| Error::Ownership {
                path: path.to_path_buf(),
                source: e,
            })
    }
}
