use crate::cli::app::InstallArg;
use crate::cli::session::Session;
use crate::ui;
use anyhow::Result;
use hifi_install::hooks::TracingHook;
use hifi_install::{ArtifactSource, Installer};
use std::process::ExitCode;
use tracing::debug;

pub fn install(arg: InstallArg, session: &Session) -> Result<ExitCode> {
    let ctx = session.context();
    let reboot = wants_reboot(&arg)?;
    debug!(reboot, source_dir = %session.source_dir.display(), "starting install");

    ui::heading(&format!("Installing hifi-wifi on {}", session.profile));
    let installer = Installer::new(&ctx, &session.source_dir)
        .reboot(reboot)
        .hook(TracingHook)
        .hook(ui::ProgressHook);

    let report = match installer.run() {
        Ok(report) => report,
        Err(e) => {
            ui::fatal(&e);
            return Ok(ExitCode::FAILURE);
        }
    };

    match &report.source {
        ArtifactSource::Precompiled { path } => {
            ui::success(&format!("installed bundled binary {}", path.display()))
        }
        ArtifactSource::SourceBuild => ui::success("installed binary built from source"),
    }
    ui::heading("Service");
    println!("  {}", report.state);
    if !report.state.active {
        ui::warn("the service is not running yet; check `systemctl status hifi-wifi.service`");
    }
    if !reboot {
        ui::warn("a reboot is recommended so driver settings take effect");
    }
    Ok(ExitCode::SUCCESS)
}

/// Flags decide; otherwise ask when someone is at the terminal.
fn wants_reboot(arg: &InstallArg) -> Result<bool> {
    if arg.reboot {
        return Ok(true);
    }
    if arg.no_reboot || !ui::is_interactive() {
        return Ok(false);
    }
    Ok(ui::confirm("Reboot when the install finishes?", false)?)
}
