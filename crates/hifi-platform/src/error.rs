use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown architecture: {0}")]
    UnknownArch(String),

    #[error("not an ELF executable: {path}")]
    NotElf { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("command not found: {cmd}")]
    CommandNotFound { cmd: String },

    #[error("command failed: {cmd}, source: {source}")]
    CommandFailed { cmd: String, source: std::io::Error },

    #[error("command timed out after {timeout:?}: {cmd}")]
    TimedOut { cmd: String, timeout: Duration },

    #[error("failed to build search path: {0}")]
    SearchPath(#[source] std::env::JoinPathsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
