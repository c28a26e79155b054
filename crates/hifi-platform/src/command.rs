//! External process invocation with explicit privilege and timeouts.
//!
//! A [`Command`] only describes what to run and as whom. The
//! [`CommandRunner`] decides how: [`SystemRunner`] rewrites the invocation
//! through `sudo` where needed and enforces the timeout, while tests supply
//! their own runner to script results.

use crate::error::{Error, Result};
use crate::identity::ActingUser;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

/// Identity a command runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Privilege {
    /// Whatever the installer process itself runs as.
    Current,
    /// Root; escalated through `sudo` only when not already elevated.
    Elevated,
    /// The acting user with a controlled `HOME` and `PATH`.
    User {
        name: String,
        home: PathBuf,
        path: OsString,
    },
}

#[derive(Debug, Clone)]
pub struct Command {
    program: String,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    cwd: Option<PathBuf>,
    privilege: Privilege,
    timeout: Option<Duration>,
    interactive: bool,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            cwd: None,
            privilege: Privilege::Current,
            timeout: None,
            interactive: false,
        }
    }

    /// Run a path directly, e.g. a staged artifact.
    pub fn path(program: &Path) -> Self {
        Self::new(program.to_string_lossy())
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.envs
            .push((key.as_ref().to_os_string(), val.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn elevated(mut self) -> Self {
        self.privilege = Privilege::Elevated;
        self
    }

    pub fn as_user(mut self, user: &ActingUser, path: impl Into<OsString>) -> Self {
        self.privilege = Privilege::User {
            name: user.name.clone(),
            home: user.home.clone(),
            path: path.into(),
        };
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Inherit the terminal and wait without a deadline.
    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self.timeout = None;
        self
    }

    pub fn get_program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_envs(&self) -> &[(OsString, OsString)] {
        &self.envs
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn privilege(&self) -> &Privilege {
        &self.privilege
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Program and arguments as one display string.
    pub fn line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn run<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<Output> {
        runner.run(self)
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn ok() -> Self {
        Self::with_code(0)
    }

    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Self::default()
        }
    }

    pub fn stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Process execution seam.
pub trait CommandRunner {
    fn run(&self, cmd: &Command) -> Result<Output>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, cmd: &Command) -> Result<Output> {
        (**self).run(cmd)
    }
}

/// Runs commands on the host.
pub struct SystemRunner {
    elevated: bool,
    default_timeout: Duration,
    runtime: Runtime,
}

impl SystemRunner {
    pub fn new(elevated: bool, default_timeout: Duration) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;
        Ok(Self {
            elevated,
            default_timeout,
            runtime,
        })
    }

    /// Translate privilege into the concrete argv.
    fn argv(&self, cmd: &Command) -> (OsString, Vec<OsString>, bool) {
        let direct = || {
            (
                OsString::from(&cmd.program),
                cmd.args.clone(),
                true,
            )
        };

        let env_prefix = |extra: &[(OsString, OsString)]| -> Vec<OsString> {
            let mut argv = vec![OsString::from("env")];
            for (key, val) in extra.iter().chain(cmd.envs.iter()) {
                let mut pair = key.clone();
                pair.push("=");
                pair.push(val);
                argv.push(pair);
            }
            argv.push(OsString::from(&cmd.program));
            argv.extend(cmd.args.iter().cloned());
            argv
        };

        match &cmd.privilege {
            Privilege::Current => direct(),
            Privilege::Elevated if self.elevated => direct(),
            Privilege::Elevated => (OsString::from("sudo"), env_prefix(&[]), false),
            Privilege::User { name, home, path } if self.elevated && name != "root" => {
                let extra = [
                    (OsString::from("HOME"), home.clone().into_os_string()),
                    (OsString::from("PATH"), path.clone()),
                ];
                let mut argv = vec![OsString::from("-u"), OsString::from(name), OsString::from("-H")];
                argv.extend(env_prefix(&extra));
                (OsString::from("sudo"), argv, false)
            }
            Privilege::User { .. } => direct(),
        }
    }

    fn process(&self, cmd: &Command) -> tokio::process::Command {
        let (program, args, pass_env) = self.argv(cmd);
        let mut process = tokio::process::Command::new(program);
        process.args(args);

        if pass_env {
            if let Privilege::User { home, path, .. } = &cmd.privilege {
                process.env("HOME", home).env("PATH", path);
            }
            process.envs(cmd.envs.iter().map(|(k, v)| (k, v)));
        }
        if let Some(dir) = &cmd.cwd {
            process.current_dir(dir);
        }
        process
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &Command) -> Result<Output> {
        let map_spawn = |e: std::io::Error| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::CommandNotFound {
                    cmd: cmd.program.clone(),
                }
            } else {
                Error::CommandFailed {
                    cmd: cmd.program.clone(),
                    source: e,
                }
            }
        };

        let mut process = self.process(cmd);
        tracing::debug!(cmd = %cmd.line(), privilege = ?cmd.privilege, "spawning");

        if cmd.interactive {
            let status = self
                .runtime
                .block_on(async { process.status().await })
                .map_err(map_spawn)?;
            return Ok(Output {
                code: status.code(),
                ..Output::default()
            });
        }

        let timeout = cmd.timeout.unwrap_or(self.default_timeout);
        process
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = self.runtime.block_on(async {
            let child = process.spawn().map_err(map_spawn)?;
            match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(output) => output.map_err(|e| Error::CommandFailed {
                    cmd: cmd.program.clone(),
                    source: e,
                }),
                Err(_) => Err(Error::TimedOut {
                    cmd: cmd.line(),
                    timeout,
                }),
            }
        })?;

        let output = Output {
            code: result.status.code(),
            stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        };
        tracing::debug!(
            cmd = %cmd.program,
            code = ?output.code,
            stderr = %output.stderr.trim(),
            "finished"
        );
        Ok(output)
    }
}
