#![allow(dead_code)]

use hifi_install::{Context, Layout, Timeouts};
use hifi_platform::arch::Arch;
use hifi_platform::{ActingUser, Command, CommandRunner, DistroKind, Output, PlatformProfile};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Minimal ELF64 header for `arch`.
pub fn elf(arch: Arch) -> Vec<u8> {
    let machine: u16 = match arch {
        Arch::X86 => 3,
        Arch::ARM => 40,
        Arch::X86_64 => 62,
        Arch::ARM64 => 183,
        Arch::Unknown => 0,
    };
    let mut header = vec![0u8; 64];
    header[..4].copy_from_slice(b"\x7fELF");
    header[4] = 2; // 64-bit
    header[5] = 1; // little endian
    header[6] = 1;
    header[16..18].copy_from_slice(&3u16.to_le_bytes()); // ET_DYN
    header[18..20].copy_from_slice(&machine.to_le_bytes());
    header[20..24].copy_from_slice(&1u32.to_le_bytes());
    header[52..54].copy_from_slice(&64u16.to_le_bytes());
    header
}

pub fn write_exe(path: &Path, content: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// A throwaway root with a home directory and an installer checkout.
pub struct Sandbox {
    _dir: TempDir,
    pub root: PathBuf,
    pub home: PathBuf,
    pub source_dir: PathBuf,
    pub layout: Layout,
    pub profile: PlatformProfile,
}

impl Sandbox {
    pub fn new(distro: DistroKind) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let home = root.join("home/deck");
        let source_dir = dir.path().join("hifi-wifi-src");
        std::fs::create_dir_all(&home).unwrap();
        std::fs::create_dir_all(&source_dir).unwrap();
        std::fs::write(source_dir.join("Cargo.toml"), "[package]\nname = \"hifi-wifi\"\n").unwrap();

        let profile = PlatformProfile {
            distro_id: format!("{distro:?}").to_lowercase(),
            distro,
            is_immutable: distro.is_immutable(),
            acting_user: ActingUser {
                name: "deck".into(),
                uid: nix::unistd::getuid().as_raw(),
                gid: nix::unistd::getgid().as_raw(),
                home: home.clone(),
                shell: Some(PathBuf::from("/bin/bash")),
            },
            elevated: false,
        };

        Self {
            layout: Layout::new(&root),
            _dir: dir,
            root,
            home,
            source_dir,
            profile,
        }
    }

    pub fn context<'a>(&'a self, runner: &'a ScriptedRunner) -> Context<'a> {
        Context::new(&self.profile, &self.layout, Timeouts::default(), runner)
    }

    pub fn runner(&self) -> ScriptedRunner {
        ScriptedRunner::new(self.layout.clone(), self.home.clone())
    }

    /// Put an executable at `rel` below the root.
    pub fn install_tool(&self, rel: &str) -> PathBuf {
        let path = self.root.join(rel);
        write_exe(&path, b"#!/bin/sh\n");
        path
    }

    pub fn bundle(&self, rel: &str, arch: Arch) -> PathBuf {
        let path = self.source_dir.join(rel);
        write_exe(&path, &elf(arch));
        path
    }
}

/// Records every command and fakes the side effects the installer relies on.
pub struct ScriptedRunner {
    layout: Layout,
    home: PathBuf,
    calls: RefCell<Vec<Command>>,
    failing: RefCell<Vec<String>>,
    missing: RefCell<Vec<String>>,
    qdiscs: RefCell<HashMap<String, String>>,
    active: Cell<bool>,
    enabled: Cell<bool>,
}

impl ScriptedRunner {
    pub fn new(layout: Layout, home: PathBuf) -> Self {
        Self {
            layout,
            home,
            calls: RefCell::new(Vec::new()),
            failing: RefCell::new(Vec::new()),
            missing: RefCell::new(Vec::new()),
            qdiscs: RefCell::new(HashMap::new()),
            active: Cell::new(false),
            enabled: Cell::new(false),
        }
    }

    /// Any command whose line contains `pattern` exits 1.
    pub fn fail(&self, pattern: &str) {
        self.failing.borrow_mut().push(pattern.to_string());
    }

    /// Spawning `program` reports it as not installed.
    pub fn missing(&self, program: &str) {
        self.missing.borrow_mut().push(program.to_string());
    }

    pub fn qdisc(&self, iface: &str, json: &str) {
        self.qdiscs
            .borrow_mut()
            .insert(iface.to_string(), json.to_string());
    }

    pub fn service_running(&self) {
        self.active.set(true);
        self.enabled.set(true);
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Command::line).collect()
    }

    pub fn calls(&self) -> Vec<Command> {
        self.calls.borrow().clone()
    }

    /// Invocations whose program file name is `program` and whose arguments
    /// start with `args`.
    pub fn count(&self, program: &str, args: &[&str]) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|cmd| name_of(cmd) == program)
            .filter(|cmd| {
                args.len() <= cmd.get_args().len()
                    && args.iter().zip(cmd.get_args()).all(|(a, b)| b == a)
            })
            .count()
    }

    fn side_effect(&self, cmd: &Command) -> Output {
        let args: Vec<String> = cmd
            .get_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let first = args.first().map(String::as_str).unwrap_or("");
        let script = args.get(1).map(String::as_str).unwrap_or("");

        match name_of(cmd).as_str() {
            "systemctl" => match first {
                "is-active" => flag(self.active.get()),
                "is-enabled" => flag(self.enabled.get()),
                "stop" => {
                    self.active.set(false);
                    Output::ok()
                }
                "disable" => {
                    self.enabled.set(false);
                    Output::ok()
                }
                _ => Output::ok(),
            },
            "bash" if script.contains("Homebrew/install") => {
                write_exe(&self.layout.brew_bin().join("brew"), b"#!/bin/sh\n");
                Output::ok()
            }
            "brew" => match first {
                "--version" => flag(Path::new(cmd.get_program()).is_file()),
                "install" => {
                    write_exe(&self.layout.brew_bin().join("gcc-14"), b"");
                    write_exe(&self.layout.brew_bin().join("g++-14"), b"");
                    // brew often exits non-zero after a usable install
                    Output::with_code(1)
                }
                _ => Output::ok(),
            },
            "sh" if script.contains("sh.rustup.rs") => {
                let bin = self.home.join(".cargo/bin");
                write_exe(&bin.join("cargo"), b"");
                write_exe(&bin.join("rustup"), b"");
                Output::ok()
            }
            "cargo" => match first {
                "--version" => flag(Path::new(cmd.get_program()).is_file()),
                "build" => {
                    let dir = cmd.get_current_dir().unwrap_or(Path::new("."));
                    write_exe(
                        &dir.join("target/release/hifi-wifi"),
                        &elf(Arch::X86_64),
                    );
                    Output::ok()
                }
                _ => Output::ok(),
            },
            "pacman" | "dnf" | "apt-get" | "zypper" => {
                write_exe(&self.layout.root.join("usr/bin/gcc"), b"");
                Output::ok()
            }
            "hifi-wifi" => match first {
                "install" => {
                    write_exe(&self.layout.installed_binary, &elf(Arch::X86_64));
                    std::fs::create_dir_all(self.layout.system_unit.parent().unwrap()).unwrap();
                    std::fs::write(&self.layout.system_unit, "[Unit]\n").unwrap();
                    self.service_running();
                    Output::ok()
                }
                _ => Output::ok(),
            },
            "loginctl" if first == "disable-linger" => {
                let user = args.get(1).cloned().unwrap_or_default();
                let _ = std::fs::remove_file(self.layout.linger_dir.join(user));
                Output::ok()
            }
            "tc" if first == "-j" => {
                let iface = args.last().cloned().unwrap_or_default();
                let json = self
                    .qdiscs
                    .borrow()
                    .get(&iface)
                    .cloned()
                    .unwrap_or_else(|| "[]".to_string());
                Output::ok().stdout(json)
            }
            "tc" if first == "qdisc" && args.get(1).is_some_and(|a| a == "del") => {
                let iface = args.get(3).cloned().unwrap_or_default();
                self.qdiscs.borrow_mut().remove(&iface);
                Output::ok()
            }
            _ => Output::ok(),
        }
    }
}

fn flag(ok: bool) -> Output {
    if ok { Output::ok() } else { Output::with_code(1) }
}

fn name_of(cmd: &Command) -> String {
    Path::new(cmd.get_program())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &Command) -> hifi_platform::Result<Output> {
        self.calls.borrow_mut().push(cmd.clone());

        if self.missing.borrow().contains(&name_of(cmd)) {
            return Err(hifi_platform::Error::CommandNotFound {
                cmd: cmd.get_program().to_string(),
            });
        }
        let line = cmd.line();
        if self.failing.borrow().iter().any(|p| line.contains(p.as_str())) {
            return Ok(Output::with_code(1));
        }
        Ok(self.side_effect(cmd))
    }
}
