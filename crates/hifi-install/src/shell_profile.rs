//! Marked `PATH` exports in the acting user's shell startup files.
//!
//! Edits are line transformations: owned lines are recognised by the marker
//! comment or by a `PATH` export naming the install directory, and every
//! other line is carried over byte for byte.

use crate::context::Context;
use crate::error::Result;
use crate::outcome::StepOutcome;
use hifi_fs::{AtomicWriteOptions, Ownership, PermissionMode};
use hifi_platform::shell::Shell;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

pub const MARKER: &str = "# Added by hifi-wifi";

/// Recognises lines this installer wrote.
pub struct OwnedLines {
    export: Regex,
}

impl OwnedLines {
    pub fn new(install_dir: &Path) -> Result<Self> {
        let dir = regex::escape(install_dir.to_string_lossy().trim_end_matches('/'));
        let pattern = format!(
            r#"^\s*(export\s+PATH=|PATH=|fish_add_path\b|set\s+(-\w+\s+)*PATH\b).*{dir}(/|["':;\s]|$)"#
        );
        Ok(Self {
            export: Regex::new(&pattern)?,
        })
    }

    pub fn is_owned(&self, line: &str) -> bool {
        let line = line.trim_end_matches(['\n', '\r']);
        line.trim() == MARKER || self.export.is_match(line)
    }

    /// `content` without owned lines, or `None` when nothing is owned.
    pub fn strip(&self, content: &str) -> Option<String> {
        let mut removed = false;
        let kept: String = content
            .split_inclusive('\n')
            .filter(|line| {
                let owned = self.is_owned(line);
                removed |= owned;
                !owned
            })
            .collect();
        removed.then_some(kept)
    }
}

fn shell(ctx: &Context<'_>) -> Shell {
    Shell::from_login_shell(ctx.user().shell.as_deref())
}

/// Remove owned lines from every startup file of the acting user.
pub fn strip_exports(ctx: &Context<'_>) -> Result<StepOutcome> {
    let owned = OwnedLines::new(&ctx.layout.install_dir)?;
    let mut cleaned = Vec::new();

    for file in shell(ctx).profile_files(&ctx.user().home) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let Some(stripped) = owned.strip(&content) else {
            continue;
        };
        hifi_fs::atomic_write(
            &file,
            stripped.as_bytes(),
            AtomicWriteOptions::new().preserve_existing().sync(true),
        )?;
        debug!(file = %file.display(), "removed PATH export");
        cleaned.push(file.display().to_string());
    }

    Ok(if cleaned.is_empty() {
        StepOutcome::ignored("no shell profile carries an export")
    } else {
        StepOutcome::done(format!("cleaned {}", cleaned.join(", ")))
    })
}

/// Append a marked export of the install directory to the login shell's
/// startup file, unless one is already there.
pub fn append_export(ctx: &Context<'_>) -> Result<StepOutcome> {
    let shell = shell(ctx);
    let user = ctx.user();
    let rc = shell.rc_file(&user.home);
    let owned = OwnedLines::new(&ctx.layout.install_dir)?;

    let existing = match std::fs::read_to_string(&rc) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };
    if existing
        .as_deref()
        .is_some_and(|c| c.lines().any(|l| owned.is_owned(l) && l.trim() != MARKER))
    {
        return Ok(StepOutcome::ignored(format!(
            "{} already exports the install directory",
            rc.display()
        )));
    }

    let mut content = existing.clone().unwrap_or_default();
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(MARKER);
    content.push('\n');
    content.push_str(&shell.path_export(&ctx.layout.install_dir));
    content.push('\n');

    let mut options = AtomicWriteOptions::new().preserve_existing().sync(true);
    if existing.is_none() {
        options = options.permissions(PermissionMode::ReadWrite);
        if let Some(dir) = rc.parent() {
            std::fs::create_dir_all(dir)?;
        }
        if ctx.profile.elevated {
            options = options.owner(Ownership::new(user.uid, user.gid));
        }
    }
    hifi_fs::atomic_write(&rc, content.as_bytes(), options)?;
    info!(file = %rc.display(), "added PATH export");
    Ok(StepOutcome::done(format!("added PATH export to {}", rc.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned() -> OwnedLines {
        OwnedLines::new(Path::new("/var/lib/hifi-wifi")).unwrap()
    }

    #[test]
    fn test_owned_lines() {
        let owned = owned();
        assert!(owned.is_owned("# Added by hifi-wifi\n"));
        assert!(owned.is_owned("export PATH=\"$PATH:/var/lib/hifi-wifi\""));
        assert!(owned.is_owned("export PATH=/var/lib/hifi-wifi:$PATH"));
        assert!(owned.is_owned("fish_add_path --append /var/lib/hifi-wifi"));
        assert!(owned.is_owned("set -gx PATH $PATH /var/lib/hifi-wifi"));
    }

    #[test]
    fn test_foreign_lines_untouched() {
        let owned = owned();
        assert!(!owned.is_owned("export PATH=\"$PATH:/opt/other/bin\""));
        assert!(!owned.is_owned("export PATH=\"$PATH:/var/lib/hifi-wifi-extras\""));
        assert!(!owned.is_owned("alias hw=/var/lib/hifi-wifi/hifi-wifi"));
        assert!(!owned.is_owned("# Added by hifi-wifi-tools"));
    }

    #[test]
    fn test_strip_preserves_other_bytes() {
        let content = "alias ll='ls -l'\r\n\
                       export PATH=\"$PATH:/opt/other/bin\"\n\
                       \n\
                       # Added by hifi-wifi\n\
                       export PATH=\"$PATH:/var/lib/hifi-wifi\"\n\
                       tail-without-newline";
        let stripped = owned().strip(content).unwrap();
        assert_eq!(
            stripped,
            "alias ll='ls -l'\r\nexport PATH=\"$PATH:/opt/other/bin\"\n\ntail-without-newline"
        );
    }

    #[test]
    fn test_strip_nothing_owned() {
        assert_eq!(owned().strip("export EDITOR=vim\n"), None);
    }
}
