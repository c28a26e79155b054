use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hifi-setup", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    #[command(subcommand)]
    pub cmd: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file with installer settings
    #[arg(long, global = true, env = "HIFI_SETUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Filesystem prefix all system paths live under
    #[arg(long, global = true, env = "HIFI_SETUP_ROOT")]
    pub root: Option<PathBuf>,

    /// Directory holding a bundled binary or the hifi-wifi sources
    #[arg(long, global = true, env = "HIFI_SETUP_SOURCE_DIR")]
    pub source_dir: Option<PathBuf>,

    /// Timeout in seconds for ordinary commands
    #[arg(long, global = true, env = "HIFI_SETUP_COMMAND_TIMEOUT")]
    pub command_timeout: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "i", name = "install", about = "Install and start the hifi-wifi service")]
    Install(InstallArg),
    #[command(alias = "rm", name = "uninstall", about = "Remove everything hifi-wifi installed")]
    Uninstall(UninstallArg),
    #[command(alias = "st", name = "status", about = "Show platform and service state")]
    Status,
    #[command(name = "monitor", about = "Run the agent's live monitor")]
    Monitor,
}

#[derive(Debug, Clone, Args)]
pub struct InstallArg {
    /// Reboot when the install finishes
    #[arg(long, conflicts_with = "no_reboot")]
    pub reboot: bool,

    /// Never offer a reboot
    #[arg(long)]
    pub no_reboot: bool,
}

#[derive(Debug, Clone, Args)]
pub struct UninstallArg {
    /// Also remove /etc/hifi-wifi without asking
    #[arg(long)]
    pub purge: bool,
}
