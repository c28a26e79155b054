use clap::Parser;
use cli::app::{App, Commands};
use cli::session::{self, Session};
use hifi_platform::ElevationContext;
use std::process::ExitCode;
use tracing::debug;

mod cli;
mod ui;

fn main() -> ExitCode {
    let app = App::parse();
    init_logging(app.global.verbose);

    match run(app) {
        Ok(code) => code,
        Err(e) => {
            ui::failure(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(app: App) -> anyhow::Result<ExitCode> {
    let elevation = ElevationContext::from_env();
    let needs_root = matches!(
        app.cmd,
        Commands::Install(_) | Commands::Uninstall(_) | Commands::Monitor
    );
    if needs_root && !elevation.is_elevated() {
        debug!("not running as root, re-running through sudo");
        return session::reexec_elevated();
    }

    let session = Session::open(&app.global, &elevation)?;
    match app.cmd {
        Commands::Install(arg) => cli::install::install(arg, &session),
        Commands::Uninstall(arg) => cli::uninstall::uninstall(arg, &session),
        Commands::Status => cli::status::status(&session),
        Commands::Monitor => cli::status::monitor(&session),
    }
}
