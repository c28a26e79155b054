//! Every path the installer writes to or removes.

use std::path::{Path, PathBuf};

pub const SERVICE_UNIT: &str = "hifi-wifi.service";
pub const REPAIR_UNIT: &str = "hifi-wifi-repair.service";
pub const BINARY_NAME: &str = "hifi-wifi";

/// Driver option files written by the agent under `/etc/modprobe.d`.
pub const MODPROBE_CONFS: &[&str] = &[
    "rtl_legacy.conf",
    "ralink.conf",
    "mediatek.conf",
    "intel_wifi.conf",
    "atheros.conf",
    "broadcom.conf",
];

/// Fixed locations, all below `root` (`/` on a real system).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub install_dir: PathBuf,
    pub installed_binary: PathBuf,
    pub system_unit: PathBuf,
    pub polkit_rule: PathBuf,
    pub config_dir: PathBuf,
    pub modprobe_dir: PathBuf,
    pub sysctl_conf: PathBuf,
    pub alias: PathBuf,
    pub brew_root: PathBuf,
    pub brew_prefix: PathBuf,
    pub selinux_enforce: PathBuf,
    pub net_class: PathBuf,
    pub linger_dir: PathBuf,
    pub os_release: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let at = |rel: &str| root.join(rel);
        let install_dir = at("var/lib/hifi-wifi");
        let brew_root = at("home/linuxbrew");
        Self {
            installed_binary: install_dir.join(BINARY_NAME),
            install_dir,
            system_unit: at("etc/systemd/system").join(SERVICE_UNIT),
            polkit_rule: at("etc/polkit-1/rules.d/49-hifi-wifi.rules"),
            config_dir: at("etc/hifi-wifi"),
            modprobe_dir: at("etc/modprobe.d"),
            sysctl_conf: at("etc/sysctl.d/99-hifi-wifi.conf"),
            alias: at("usr/local/bin").join(BINARY_NAME),
            brew_prefix: brew_root.join(".linuxbrew"),
            brew_root,
            selinux_enforce: at("sys/fs/selinux/enforce"),
            net_class: at("sys/class/net"),
            linger_dir: at("var/lib/systemd/linger"),
            os_release: at("etc/os-release"),
            root,
        }
    }

    pub fn brew_bin(&self) -> PathBuf {
        self.brew_prefix.join("bin")
    }

    pub fn modprobe_confs(&self) -> impl Iterator<Item = PathBuf> + '_ {
        MODPROBE_CONFS.iter().map(|f| self.modprobe_dir.join(f))
    }

    pub fn user_repair_unit(&self, home: &Path) -> PathBuf {
        home.join(".config/systemd/user").join(REPAIR_UNIT)
    }

    pub fn cargo_bin(&self, home: &Path) -> PathBuf {
        home.join(".cargo/bin")
    }

    /// Where a provisioned artifact is staged before `install`.
    pub fn staged_binary(source_dir: &Path) -> PathBuf {
        source_dir.join("bin").join(BINARY_NAME)
    }
}
