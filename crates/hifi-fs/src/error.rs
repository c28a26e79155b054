use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to link {link} -> {target}: {source}")]
    Symlink {
        target: PathBuf,
        link: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to change owner of {path}: {source}")]
    Ownership {
        path: PathBuf,
        source: nix::Error,
    },

    #[error("path has no parent directory: {0}")]
    NoParent(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
