//! Login shell classification and its startup files.

use std::path::{Path, PathBuf};

/// Shell types the installer knows how to edit profiles for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Sh,
    Unknown,
}

/// Startup files that may carry `PATH` exports, regardless of login shell.
const COMMON_PROFILES: &[&str] = &[".bashrc", ".bash_profile", ".profile", ".zshrc"];

impl Shell {
    /// Classify a login shell from the identity database entry.
    pub fn from_login_shell(shell: Option<&Path>) -> Self {
        let Some(name) = shell.and_then(Path::file_name).and_then(|n| n.to_str()) else {
            return Shell::Unknown;
        };
        match name {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "sh" | "dash" => Shell::Sh,
            _ => Shell::Unknown,
        }
    }

    /// The interactive startup file a new `PATH` entry is appended to.
    pub fn rc_file(self, home: &Path) -> PathBuf {
        match self {
            Shell::Bash => home.join(".bashrc"),
            Shell::Zsh => home.join(".zshrc"),
            Shell::Fish => home.join(".config").join("fish").join("config.fish"),
            Shell::Sh | Shell::Unknown => home.join(".profile"),
        }
    }

    /// Line appending `dir` to `PATH` in this shell's syntax.
    pub fn path_export(self, dir: &Path) -> String {
        match self {
            Shell::Fish => format!("fish_add_path --append {}", dir.display()),
            _ => format!("export PATH=\"$PATH:{}\"", dir.display()),
        }
    }

    /// Every startup file worth scanning for exports this installer owns.
    pub fn profile_files(self, home: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = COMMON_PROFILES.iter().map(|f| home.join(f)).collect();
        let rc = self.rc_file(home);
        if !files.contains(&rc) {
            files.push(rc);
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_login_shell() {
        assert_eq!(Shell::from_login_shell(Some(Path::new("/bin/bash"))), Shell::Bash);
        assert_eq!(Shell::from_login_shell(Some(Path::new("/usr/bin/fish"))), Shell::Fish);
        assert_eq!(Shell::from_login_shell(Some(Path::new("/bin/tcsh"))), Shell::Unknown);
        assert_eq!(Shell::from_login_shell(None), Shell::Unknown);
    }

    #[test]
    fn test_profile_files_include_rc_once() {
        let home = Path::new("/home/deck");
        let files = Shell::Bash.profile_files(home);
        assert_eq!(files.iter().filter(|f| f.ends_with(".bashrc")).count(), 1);

        let files = Shell::Fish.profile_files(home);
        assert!(files.contains(&home.join(".config/fish/config.fish")));
    }

    #[test]
    fn test_path_export_syntax() {
        let dir = Path::new("/var/lib/hifi-wifi");
        assert_eq!(
            Shell::Bash.path_export(dir),
            "export PATH=\"$PATH:/var/lib/hifi-wifi\""
        );
        assert!(Shell::Fish.path_export(dir).starts_with("fish_add_path"));
    }
}
