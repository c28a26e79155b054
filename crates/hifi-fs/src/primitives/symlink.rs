use crate::{Error, Result};
use std::path::Path;

/// Create `link` pointing at `target`, replacing a stale link already there.
pub fn symlink(target: impl AsRef<Path>, link: impl AsRef<Path>) -> Result<()> {
    let target = target.as_ref();
    let link = link.as_ref();

    let err = |e| Error::Symlink {
        target: target.to_path_buf(),
        link: link.to_path_buf(),
        source: e,
    };

    if let Ok(meta) = link.symlink_metadata()
        && meta.file_type().is_symlink()
    {
        std::fs::remove_file(link).map_err(err)?;
    }
    std::os::unix::fs::symlink(target, link).map_err(err)
}

/// Whether anything, including a dangling link, occupies `path`.
pub fn link_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().symlink_metadata().is_ok()
}
