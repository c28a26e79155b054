use crate::cli::app::UninstallArg;
use crate::cli::session::Session;
use crate::ui;
use anyhow::Result;
use hifi_install::{ReversalOrchestrator, UninstallPlan};
use std::process::ExitCode;
use tracing::debug;

pub fn uninstall(arg: UninstallArg, session: &Session) -> Result<ExitCode> {
    let ctx = session.context();
    let purge = arg.purge
        || (ui::is_interactive()
            && session.layout.config_dir.exists()
            && ui::confirm(
                &format!("Also remove {}?", session.layout.config_dir.display()),
                false,
            )?);
    let plan = UninstallPlan::new(purge);
    debug!(purge, steps = plan.steps().len(), "starting uninstall");

    ui::heading("Removing hifi-wifi");
    let report = ReversalOrchestrator::new(&ctx).execute(&plan);
    for step in &report.steps {
        match &step.result {
            Ok(outcome) => ui::outcome(&step.step.to_string(), outcome),
            Err(e) => ui::failure(&format!("{}: {e}", step.step)),
        }
    }

    if report.is_clean() {
        ui::success("hifi-wifi has been removed");
        Ok(ExitCode::SUCCESS)
    } else {
        let failed = report.failures().count();
        ui::warn(&format!("{failed} step(s) could not be completed; see the messages above"));
        Ok(ExitCode::FAILURE)
    }
}
