use crate::identity::{ActingUser, ElevationContext};
use crate::os::{DistroKind, OsRelease};
use std::fmt;
use std::path::Path;

/// Resolved execution context, built once and passed into every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub distro_id: String,
    pub distro: DistroKind,
    pub is_immutable: bool,
    pub acting_user: ActingUser,
    pub elevated: bool,
}

impl PlatformProfile {
    pub fn detect(ctx: &ElevationContext, os_release: &Path) -> Self {
        let release = OsRelease::load(os_release);
        Self::from_parts(&release, ActingUser::resolve(ctx), ctx.is_elevated())
    }

    pub fn from_parts(release: &OsRelease, acting_user: ActingUser, elevated: bool) -> Self {
        let distro = release.kind();
        let distro_id = if release.id.is_empty() {
            "unknown".to_string()
        } else {
            release.id.clone()
        };

        Self {
            distro_id,
            distro,
            is_immutable: distro.is_immutable(),
            acting_user,
            elevated,
        }
    }
}

impl fmt::Display for PlatformProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {}), user {} ({})",
            self.distro_id,
            self.distro,
            if self.is_immutable { "immutable" } else { "mutable" },
            self.acting_user.name,
            self.acting_user.home.display(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn deck() -> ActingUser {
        ActingUser {
            name: "deck".into(),
            uid: 1000,
            gid: 1000,
            home: PathBuf::from("/home/deck"),
            shell: Some(PathBuf::from("/bin/bash")),
        }
    }

    #[test]
    fn test_steamos_profile_is_immutable() {
        let profile = PlatformProfile::from_parts(&OsRelease::parse("ID=steamos\n"), deck(), true);
        assert_eq!(profile.distro_id, "steamos");
        assert_eq!(profile.distro, DistroKind::SteamOs);
        assert!(profile.is_immutable);
    }

    #[test]
    fn test_absent_descriptor_falls_back() {
        let profile = PlatformProfile::from_parts(&OsRelease::default(), deck(), false);
        assert_eq!(profile.distro_id, "unknown");
        assert_eq!(profile.distro, DistroKind::Unknown);
        assert!(!profile.is_immutable);
    }
}
