use crate::cli::session::{Session, exit_code};
use crate::ui;
use anyhow::{Context as _, Result};
use hifi_install::ServiceState;
use hifi_install::service::ServiceInstaller;
use hifi_platform::Command;
use std::process::ExitCode;

pub fn status(session: &Session) -> Result<ExitCode> {
    let ctx = session.context();
    ui::heading("Platform");
    println!("  {}", session.profile);
    ui::heading("Service");
    let state = ServiceState::probe(&ctx);
    println!("  {state}");

    if !state.unit_registered {
        ui::warn("hifi-wifi is not installed");
        return Ok(ExitCode::FAILURE);
    }
    let program = ServiceInstaller::new(&ctx).resolve_command();
    let out = Command::path(&program)
        .arg("status")
        .interactive()
        .run(ctx.runner)
        .with_context(|| format!("failed to run {} status", program.display()))?;
    Ok(exit_code(out.code))
}

/// Hand the terminal to the agent's live monitor.
pub fn monitor(session: &Session) -> Result<ExitCode> {
    let ctx = session.context();
    let program = ServiceInstaller::new(&ctx).resolve_command();
    let out = Command::path(&program)
        .arg("monitor")
        .elevated()
        .interactive()
        .run(ctx.runner)
        .with_context(|| format!("failed to run {} monitor", program.display()))?;
    Ok(exit_code(out.code))
}
