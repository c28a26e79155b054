//! Installer configuration.
//!
//! Values come from CLI flags first, then an optional TOML file, then the
//! defaults below.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    /// Filesystem prefix every fixed path lives under.
    pub root: PathBuf,
    /// Directory holding the installer and any bundled artifact.
    pub source_dir: Option<PathBuf>,
    pub timeouts: Timeouts,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            source_dir: None,
            timeouts: Timeouts::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    /// Ordinary commands: probes, systemctl, tc.
    pub command_secs: u64,
    /// Package installs, toolchain installs and builds.
    pub long_running_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command_secs: 120,
            long_running_secs: 3600,
        }
    }
}

impl Timeouts {
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    pub fn long_running(&self) -> Duration {
        Duration::from_secs(self.long_running_secs)
    }
}

impl InstallerConfig {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }
}
