use crate::permissions::{Ownership, PermissionMode};
use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriteOptions {
    pub permissions: Option<PermissionMode>,
    pub owner: Option<Ownership>,
    /// Carry the replaced file's mode and owner over to the new content.
    pub preserve_existing: bool,
    pub sync: bool,
}

impl AtomicWriteOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn permissions(mut self, mode: PermissionMode) -> Self {
        self.permissions = Some(mode);
        self
    }
    pub fn owner(mut self, owner: Ownership) -> Self {
        self.owner = Some(owner);
        self
    }
    pub fn preserve_existing(mut self) -> Self {
        self.preserve_existing = true;
        self
    }
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Mode and owner the written file should end up with.
    fn resolve(&self, path: &Path) -> (PermissionMode, Option<Ownership>) {
        let mut mode = self.permissions.unwrap_or_default();
        let mut owner = self.owner;
        if self.preserve_existing
            && let Ok(meta) = fs::metadata(path)
        {
            if self.permissions.is_none() {
                mode = PermissionMode::Custom(meta.permissions().mode() & 0o7777);
            }
            if owner.is_none() {
                owner = Ownership::of(path).ok();
            }
        }
        (mode, owner)
    }
}

/// Where a write to `path` lands: the file a symlink points at, so the link
/// itself survives the rename.
fn write_target(path: &Path) -> Result<PathBuf> {
    let is_link = fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink());
    if !is_link {
        return Ok(path.to_path_buf());
    }
    if let Ok(resolved) = fs::canonicalize(path) {
        return Ok(resolved);
    }
    // dangling: create the file the link names
    let target = fs::read_link(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(match path.parent() {
        Some(dir) if target.is_relative() => dir.join(target),
        _ => target,
    })
}

/// Replace `path` with `content` through a sibling temporary file and a rename.
/// A symlinked `path` is followed and its target replaced.
pub fn atomic_write(
    path: impl AsRef<Path>,
    content: &[u8],
    options: AtomicWriteOptions,
) -> Result<()> {
    let path = write_target(path.as_ref())?;
    let path = path.as_path();
    let parent = path
        .parent()
        .ok_or_else(|| Error::NoParent(path.to_path_buf()))?;
    let (mode, owner) = options.resolve(path);

    let write_err = |e| Error::Write {
        path: path.to_path_buf(),
        source: e,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp.")
        .suffix(".hifi")
        .tempfile_in(parent)
        .map_err(write_err)?;
    tmp.write_all(content).map_err(write_err)?;
    if options.sync {
        tmp.as_file().sync_all().map_err(write_err)?;
    }

    mode.apply_to_path(tmp.path())?;
    if let Some(owner) = owner {
        owner.apply_to_path(tmp.path())?;
    }

    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

pub fn atomic_read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|e| Error::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Copy `src` over `dest` without ever exposing a partial destination.
pub fn atomic_copy(
    src: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: AtomicWriteOptions,
) -> Result<()> {
    let content = atomic_read(src)?;
    atomic_write(dest, &content, options)
}
