//! Controlled `PATH` construction and program lookup.

use crate::error::{Error, Result};
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// System binary directories, in lookup order.
const SYSTEM_DIRS: &[&str] = &[
    "usr/local/sbin",
    "usr/local/bin",
    "usr/sbin",
    "usr/bin",
    "sbin",
    "bin",
];

fn paths_equal(p1: &Path, p2: &Path) -> bool {
    fn normalize(p: &Path) -> String {
        let s = p.to_string_lossy();
        let trimmed = s.trim_end_matches('/');
        if trimmed.is_empty() && !s.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        }
    }
    normalize(p1) == normalize(p2)
}

/// An explicit search path, never read from the ambient environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    paths: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard system directories below `root`.
    pub fn system(root: &Path) -> Self {
        Self {
            paths: SYSTEM_DIRS.iter().map(|dir| root.join(dir)).collect(),
        }
    }

    pub fn prepend(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.paths.retain(|p| !paths_equal(p, &path));
        self.paths.insert(0, path);
        self
    }

    pub fn append(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !self.contains(&path) {
            self.paths.push(path);
        }
        self
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| paths_equal(p, path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn build(&self) -> Result<OsString> {
        env::join_paths(&self.paths).map_err(Error::SearchPath)
    }

    /// Locate an executable on this search path.
    pub fn find(&self, program: &str) -> Option<PathBuf> {
        let joined = self.build().ok()?;
        which::which_in(program, Some(joined), "/").ok()
    }
}
