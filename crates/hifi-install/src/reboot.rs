use crate::context::Context;
use crate::outcome::StepOutcome;
use hifi_platform::Command;
use tracing::{debug, warn};

/// Ask the system to reboot, degrading from systemd to logind over D-Bus to
/// a printed instruction. Never fails.
pub fn request_reboot(ctx: &Context<'_>) -> StepOutcome {
    let runtime = ctx.user().runtime_dir();
    let attempts: [(&str, Command); 2] = [
        (
            "systemctl",
            ctx.elevated("systemctl").arg("reboot"),
        ),
        (
            "logind",
            ctx.as_user("dbus-send")
                .args([
                    "--system",
                    "--print-reply",
                    "--dest=org.freedesktop.login1",
                    "/org/freedesktop/login1",
                    "org.freedesktop.login1.Manager.Reboot",
                    "boolean:true",
                ])
                .env("XDG_RUNTIME_DIR", &runtime),
        ),
    ];

    for (via, cmd) in attempts {
        match cmd.run(ctx.runner) {
            Ok(out) if out.success() => return StepOutcome::done(format!("reboot requested via {via}")),
            Ok(out) => debug!(via, code = ?out.code, "reboot request refused"),
            Err(e) => debug!(via, error = %e, "reboot request failed"),
        }
    }
    warn!("could not request a reboot");
    StepOutcome::ignored("reboot manually to finish: sudo reboot")
}
