//! Distribution detection from the os-release descriptor.

use std::fs;
use std::path::Path;

/// Linux distribution families the installer distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistroKind {
    SteamOs,
    Bazzite,
    ChimeraOs,
    FedoraAtomic,
    Arch,
    Fedora,
    Debian,
    Ubuntu,
    OpenSuse,
    Unknown,
}

/// Fedora variants that ship as ostree images.
const FEDORA_ATOMIC_VARIANTS: &[&str] = &["silverblue", "kinoite", "sericea", "onyx", "cosmic-atomic"];

impl DistroKind {
    /// Whether the root filesystem is read-only and replaced wholesale on update.
    pub fn is_immutable(self) -> bool {
        matches!(
            self,
            Self::SteamOs | Self::Bazzite | Self::ChimeraOs | Self::FedoraAtomic
        )
    }

    /// System package command that provides a C compiler, for mutable hosts.
    pub fn compiler_package_command(self) -> Option<(&'static str, &'static [&'static str])> {
        match self {
            Self::Arch => Some(("pacman", &["-S", "--needed", "--noconfirm", "gcc"])),
            Self::Fedora => Some(("dnf", &["install", "-y", "gcc"])),
            Self::Debian | Self::Ubuntu => Some(("apt-get", &["install", "-y", "build-essential"])),
            Self::OpenSuse => Some(("zypper", &["--non-interactive", "install", "gcc"])),
            Self::SteamOs
            | Self::Bazzite
            | Self::ChimeraOs
            | Self::FedoraAtomic
            | Self::Unknown => None,
        }
    }

    fn from_id(id: &str, variant: Option<&str>) -> Option<Self> {
        let kind = match id {
            "steamos" => Self::SteamOs,
            "bazzite" => Self::Bazzite,
            "chimeraos" => Self::ChimeraOs,
            "fedora" if variant.is_some_and(|v| FEDORA_ATOMIC_VARIANTS.contains(&v)) => {
                Self::FedoraAtomic
            }
            "fedora" | "nobara" => Self::Fedora,
            "arch" | "manjaro" | "endeavouros" | "cachyos" | "garuda" => Self::Arch,
            "debian" => Self::Debian,
            "ubuntu" | "linuxmint" | "pop" => Self::Ubuntu,
            id if id.starts_with("opensuse") => Self::OpenSuse,
            _ => return None,
        };
        Some(kind)
    }
}

/// The fields of `/etc/os-release` the installer cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub id_like: Vec<String>,
    pub variant_id: Option<String>,
}

impl OsRelease {
    /// Read the descriptor, falling back to an empty (unknown) release when absent.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "os-release unavailable");
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut release = Self::default();

        for line in content.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            match key {
                "ID" => release.id = value.to_ascii_lowercase(),
                "ID_LIKE" => {
                    release.id_like = value
                        .split_whitespace()
                        .map(str::to_ascii_lowercase)
                        .collect();
                }
                "VARIANT_ID" => release.variant_id = Some(value.to_ascii_lowercase()),
                _ => {}
            }
        }

        release
    }

    /// Classify the release; `ID` wins over `ID_LIKE`.
    pub fn kind(&self) -> DistroKind {
        let variant = self.variant_id.as_deref();
        DistroKind::from_id(&self.id, variant)
            .or_else(|| {
                self.id_like
                    .iter()
                    .find_map(|like| DistroKind::from_id(like, variant))
            })
            .unwrap_or(DistroKind::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steamos() {
        let release = OsRelease::parse(
            "NAME=\"SteamOS\"\nPRETTY_NAME=\"SteamOS\"\nID=steamos\nID_LIKE=arch\nVARIANT_ID=steamdeck\n",
        );
        assert_eq!(release.id, "steamos");
        assert_eq!(release.id_like, vec!["arch"]);
        assert_eq!(release.kind(), DistroKind::SteamOs);
        assert!(release.kind().is_immutable());
    }

    #[test]
    fn test_id_wins_over_id_like() {
        let release = OsRelease::parse("ID=bazzite\nID_LIKE=\"fedora\"\n");
        assert_eq!(release.kind(), DistroKind::Bazzite);
    }

    #[test]
    fn test_id_like_fallback() {
        let release = OsRelease::parse("ID=someos\nID_LIKE=\"ubuntu debian\"\n");
        assert_eq!(release.kind(), DistroKind::Ubuntu);
        assert!(!release.kind().is_immutable());
    }

    #[test]
    fn test_fedora_atomic_variant() {
        let release = OsRelease::parse("ID=fedora\nVARIANT_ID=kinoite\n");
        assert_eq!(release.kind(), DistroKind::FedoraAtomic);

        let release = OsRelease::parse("ID=fedora\nVARIANT_ID=workstation\n");
        assert_eq!(release.kind(), DistroKind::Fedora);
    }

    #[test]
    fn test_missing_descriptor_is_unknown_and_mutable() {
        let release = OsRelease::load(Path::new("/nonexistent/os-release"));
        assert_eq!(release, OsRelease::default());
        assert_eq!(release.kind(), DistroKind::Unknown);
        assert!(!release.kind().is_immutable());
    }

    #[test]
    fn test_package_command_only_for_mutable() {
        assert!(DistroKind::SteamOs.compiler_package_command().is_none());
        let (program, args) = DistroKind::Arch.compiler_package_command().unwrap();
        assert_eq!(program, "pacman");
        assert!(args.contains(&"gcc"));
    }
}
