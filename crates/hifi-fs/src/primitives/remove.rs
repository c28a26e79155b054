use crate::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// What a removal found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Absent,
}

/// Remove a file, link or directory tree. A missing path is not an error.
pub fn remove_path(path: impl AsRef<Path>) -> Result<Removal> {
    let path = path.as_ref();
    let meta = match path.symlink_metadata() {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Removal::Absent),
        Err(e) => {
            return Err(Error::Remove {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(Removal::Removed),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Removal::Absent),
        Err(e) => Err(Error::Remove {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
