//! Error types for install and reversal operations.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Conditions that terminate an install run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    ArchMismatch,
    NotElf,
    BootstrapFailed,
    FetchToolMissing,
    ToolchainUnrepairable,
    BuildFailed,
    ServiceInstallFailed,
    ApplyFailed,
}

impl FatalKind {
    /// What the user can do about it.
    pub fn remediation(self) -> &'static str {
        match self {
            Self::ArchMismatch => {
                "Download the hifi-wifi release built for this machine's CPU, or delete the bundled binary to build from source."
            }
            Self::NotElf => {
                "The bundled hifi-wifi binary is not a Linux executable. Re-download the release, or delete the binary to build from source."
            }
            Self::BootstrapFailed => {
                "No working compiler could be set up. Use a precompiled hifi-wifi release instead; it needs no build tools."
            }
            Self::FetchToolMissing => "Install curl, then run the installer again.",
            Self::ToolchainUnrepairable => {
                "Reinstall Rust by hand: remove ~/.rustup and ~/.cargo, run the installer from https://rustup.rs, then run this installer again."
            }
            Self::BuildFailed => {
                "Review the build output above. A precompiled hifi-wifi release avoids building from source."
            }
            Self::ServiceInstallFailed => {
                "Run `sudo /var/lib/hifi-wifi/hifi-wifi install` by hand to see the full error."
            }
            Self::ApplyFailed => {
                "Run `sudo hifi-wifi apply` by hand and check `journalctl -u hifi-wifi.service`."
            }
        }
    }
}

impl fmt::Display for FatalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ArchMismatch => "architecture mismatch",
            Self::NotElf => "not an executable",
            Self::BootstrapFailed => "build environment bootstrap failed",
            Self::FetchToolMissing => "fetch tool missing",
            Self::ToolchainUnrepairable => "toolchain unrepairable",
            Self::BuildFailed => "build failed",
            Self::ServiceInstallFailed => "service install failed",
            Self::ApplyFailed => "apply failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind}: {message}")]
    Fatal { kind: FatalKind, message: String },

    #[error(transparent)]
    Platform(#[from] hifi_platform::Error),

    #[error(transparent)]
    Fs(#[from] hifi_fs::Error),

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn fatal(kind: FatalKind, message: impl Into<String>) -> Self {
        Self::Fatal {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> Option<FatalKind> {
        match self {
            Self::Fatal { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn remediation(&self) -> Option<&'static str> {
        self.kind().map(FatalKind::remediation)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
