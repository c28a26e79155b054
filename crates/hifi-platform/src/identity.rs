//! Elevation context and acting-user resolution.

use nix::unistd::{Uid, User};
use std::env;
use std::path::PathBuf;

/// Snapshot of the process identity, taken once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevationContext {
    pub euid: u32,
    pub uid: u32,
    pub gid: u32,
    /// Identity that requested elevation through sudo.
    pub sudo_user: Option<String>,
    /// Identity that requested elevation through pkexec.
    pub pkexec_uid: Option<u32>,
    pub login_name: Option<String>,
    pub home: Option<PathBuf>,
}

impl ElevationContext {
    pub fn from_env() -> Self {
        Self {
            euid: nix::unistd::geteuid().as_raw(),
            uid: nix::unistd::getuid().as_raw(),
            gid: nix::unistd::getgid().as_raw(),
            sudo_user: env::var("SUDO_USER").ok().filter(|u| !u.is_empty()),
            pkexec_uid: env::var("PKEXEC_UID").ok().and_then(|u| u.parse().ok()),
            login_name: env::var("USER").ok().or_else(|| env::var("LOGNAME").ok()),
            home: home::home_dir(),
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.euid == 0
    }
}

/// The non-privileged identity the installation is performed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
    pub shell: Option<PathBuf>,
}

impl ActingUser {
    /// Resolve the acting user, consulting the identity database when elevated
    /// on behalf of someone else. Never fails.
    pub fn resolve(ctx: &ElevationContext) -> Self {
        if ctx.is_elevated() {
            let delegated = match (&ctx.sudo_user, ctx.pkexec_uid) {
                (Some(name), _) if name != "root" => User::from_name(name).ok().flatten(),
                (_, Some(uid)) if uid != 0 => User::from_uid(Uid::from_raw(uid)).ok().flatten(),
                _ => None,
            };
            if let Some(user) = delegated {
                return Self::from(user);
            }
        }

        match User::from_uid(Uid::from_raw(ctx.uid)) {
            Ok(Some(user)) => Self::from(user),
            _ => {
                tracing::warn!(uid = ctx.uid, "identity lookup failed, using process environment");
                Self {
                    name: ctx.login_name.clone().unwrap_or_else(|| ctx.uid.to_string()),
                    uid: ctx.uid,
                    gid: ctx.gid,
                    home: ctx.home.clone().unwrap_or_else(|| PathBuf::from("/root")),
                    shell: None,
                }
            }
        }
    }

    /// Runtime directory of the user's systemd instance.
    pub fn runtime_dir(&self) -> PathBuf {
        PathBuf::from(format!("/run/user/{}", self.uid))
    }
}

impl From<User> for ActingUser {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
            shell: Some(user.shell),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unprivileged() -> ElevationContext {
        let uid = nix::unistd::getuid().as_raw();
        ElevationContext {
            euid: uid.max(1),
            uid,
            gid: nix::unistd::getgid().as_raw(),
            sudo_user: Some("someone-else".into()),
            pkexec_uid: None,
            login_name: Some("fallback".into()),
            home: Some(PathBuf::from("/home/fallback")),
        }
    }

    #[test]
    fn test_unelevated_ignores_sudo_user() {
        let ctx = unprivileged();
        let user = ActingUser::resolve(&ctx);
        assert_eq!(user.uid, ctx.uid);
        assert_ne!(user.name, "someone-else");
    }

    /// Some non-root account from the identity database.
    fn delegating_account() -> Option<User> {
        let current = User::from_uid(nix::unistd::getuid()).ok().flatten();
        current
            .into_iter()
            .chain(
                ["nobody", "daemon", "bin"]
                    .into_iter()
                    .filter_map(|name| User::from_name(name).ok().flatten()),
            )
            .find(|user| !user.uid.is_root() && user.name != "root")
    }

    fn elevated() -> ElevationContext {
        ElevationContext {
            euid: 0,
            uid: 0,
            gid: 0,
            sudo_user: None,
            pkexec_uid: None,
            login_name: Some("root".into()),
            home: Some(PathBuf::from("/nonexistent/ambient-home")),
        }
    }

    #[test]
    fn test_sudo_user_comes_from_passwd() {
        let Some(account) = delegating_account() else {
            return;
        };
        let ctx = ElevationContext {
            sudo_user: Some(account.name.clone()),
            ..elevated()
        };

        let user = ActingUser::resolve(&ctx);

        assert_eq!(user.name, account.name);
        assert_eq!(user.uid, account.uid.as_raw());
        assert_eq!(user.gid, account.gid.as_raw());
        assert_eq!(user.home, account.dir);
        assert_ne!(Some(user.home), ctx.home);
    }

    #[test]
    fn test_pkexec_uid_comes_from_passwd() {
        let Some(account) = delegating_account() else {
            return;
        };
        let ctx = ElevationContext {
            pkexec_uid: Some(account.uid.as_raw()),
            ..elevated()
        };

        let user = ActingUser::resolve(&ctx);

        assert_eq!(user.name, account.name);
        assert_eq!(user.uid, account.uid.as_raw());
        assert_eq!(user.home, account.dir);
    }

    #[test]
    fn test_sudo_from_root_stays_root() {
        let ctx = ElevationContext {
            sudo_user: Some("root".into()),
            ..elevated()
        };
        assert_eq!(ActingUser::resolve(&ctx).uid, 0);
    }

    #[test]
    fn test_elevation_flag() {
        let mut ctx = unprivileged();
        assert!(!ctx.is_elevated());
        ctx.euid = 0;
        assert!(ctx.is_elevated());
    }

    #[test]
    fn test_runtime_dir() {
        let user = ActingUser {
            name: "deck".into(),
            uid: 1000,
            gid: 1000,
            home: PathBuf::from("/home/deck"),
            shell: None,
        };
        assert_eq!(user.runtime_dir(), PathBuf::from("/run/user/1000"));
    }
}
