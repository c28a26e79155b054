use crate::config::Timeouts;
use crate::layout::Layout;
use hifi_platform::env::SearchPath;
use hifi_platform::{ActingUser, Command, CommandRunner, PlatformProfile};
use std::ffi::OsString;
use std::path::PathBuf;

/// Everything a step may consult.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub profile: &'a PlatformProfile,
    pub layout: &'a Layout,
    pub timeouts: Timeouts,
    pub runner: &'a dyn CommandRunner,
}

impl<'a> Context<'a> {
    pub fn new(
        profile: &'a PlatformProfile,
        layout: &'a Layout,
        timeouts: Timeouts,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            profile,
            layout,
            timeouts,
            runner,
        }
    }

    pub fn user(&self) -> &ActingUser {
        &self.profile.acting_user
    }

    pub fn cargo_bin(&self) -> PathBuf {
        self.layout.cargo_bin(&self.user().home)
    }

    /// The acting user's controlled search path.
    pub fn search_path(&self) -> SearchPath {
        let mut path = SearchPath::system(&self.layout.root);
        if self.profile.is_immutable {
            path = path.prepend(self.layout.brew_bin());
        }
        path.prepend(self.cargo_bin())
    }

    fn search_path_env(&self) -> OsString {
        self.search_path().build().unwrap_or_default()
    }

    /// A command run as the acting user.
    pub fn as_user(&self, program: impl Into<String>) -> Command {
        Command::new(program)
            .as_user(self.user(), self.search_path_env())
            .timeout(self.timeouts.command())
    }

    /// A command run as root.
    pub fn elevated(&self, program: impl Into<String>) -> Command {
        Command::new(program)
            .elevated()
            .timeout(self.timeouts.command())
    }

    /// `systemctl` against the user manager of the acting user.
    pub fn user_systemctl(&self) -> Command {
        let runtime = self.user().runtime_dir();
        let mut bus = OsString::from("unix:path=");
        bus.push(runtime.join("bus"));
        self.as_user("systemctl")
            .arg("--user")
            .env("XDG_RUNTIME_DIR", runtime)
            .env("DBUS_SESSION_BUS_ADDRESS", bus)
    }
}
