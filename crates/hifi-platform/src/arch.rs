//! Architecture detection for the host and for ELF executables.

use crate::error::{Error, Result};
use goblin::elf::{Elf, header};
use once_cell::sync::Lazy;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Largest ELF file header (ELF64).
const EHDR_MAX: u64 = 64;

static HOST: Lazy<Arch> = Lazy::new(Arch::probe);

/// CPU architecture types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86,
    X86_64,
    ARM,
    ARM64,
    Unknown,
}

impl Arch {
    pub fn from_name(name: &str) -> Self {
        match name {
            "i386" | "i686" | "x86" => Arch::X86,
            "x86_64" | "amd64" => Arch::X86_64,
            "arm" | "armv7l" => Arch::ARM,
            "aarch64" | "arm64" => Arch::ARM64,
            _ => Arch::Unknown,
        }
    }

    /// Architecture this installer was compiled for.
    pub fn build() -> Self {
        Self::from_name(std::env::consts::ARCH)
    }

    /// Architecture of the running host, falling back to the build target.
    pub fn detect() -> Self {
        *HOST
    }

    fn probe() -> Self {
        match Self::from_name(sysinfo::System::cpu_arch().as_str()) {
            Arch::Unknown => Self::build(),
            arch => arch,
        }
    }

    pub fn from_elf_machine(machine: u16) -> Self {
        match machine {
            header::EM_386 => Arch::X86,
            header::EM_X86_64 => Arch::X86_64,
            header::EM_ARM => Arch::ARM,
            header::EM_AARCH64 => Arch::ARM64,
            _ => Arch::Unknown,
        }
    }

    /// Read the machine tag from an executable's ELF header.
    pub fn of_executable(path: &Path) -> Result<Self> {
        let read_err = |source| Error::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut bytes = Vec::with_capacity(EHDR_MAX as usize);
        File::open(path)
            .map_err(read_err)?
            .take(EHDR_MAX)
            .read_to_end(&mut bytes)
            .map_err(read_err)?;

        if bytes.len() < header::SELFMAG || &bytes[..header::SELFMAG] != header::ELFMAG {
            return Err(Error::NotElf {
                path: path.to_path_buf(),
            });
        }

        let ehdr = Elf::parse_header(&bytes).map_err(|_| Error::NotElf {
            path: path.to_path_buf(),
        })?;
        Ok(Self::from_elf_machine(ehdr.e_machine))
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arch::X86 => "i686",
            Arch::X86_64 => "x86_64",
            Arch::ARM => "armv7",
            Arch::ARM64 => "aarch64",
            Arch::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
