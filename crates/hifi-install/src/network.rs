//! Interface classification and removal of the agent's root qdisc.

use crate::context::Context;
use crate::error::Result;
use crate::outcome::StepOutcome;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Queueing discipline the agent attaches to shaped interfaces.
pub const SHAPER_QDISC: &str = "cake";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    Wireless,
    Ethernet,
    Other,
}

impl InterfaceKind {
    pub fn classify(name: &str) -> Self {
        if name.starts_with("wl") {
            Self::Wireless
        } else if name.starts_with("en") || name.starts_with("eth") {
            Self::Ethernet
        } else {
            Self::Other
        }
    }

    pub fn is_shaped(self) -> bool {
        matches!(self, Self::Wireless | Self::Ethernet)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub kind: InterfaceKind,
}

/// Interfaces listed under `/sys/class/net`, sorted by name.
pub fn interfaces(net_class: &Path) -> Vec<Interface> {
    let Ok(entries) = std::fs::read_dir(net_class) else {
        return Vec::new();
    };
    let mut found: Vec<Interface> = entries
        .filter_map(|entry| entry.ok()?.file_name().into_string().ok())
        .map(|name| Interface {
            kind: InterfaceKind::classify(&name),
            name,
        })
        .collect();
    found.sort_by(|a, b| a.name.cmp(&b.name));
    found
}

#[derive(Debug, Deserialize)]
struct Qdisc {
    kind: String,
    #[serde(default)]
    root: bool,
}

/// Whether `tc -j qdisc show` output lists a root qdisc of `kind`.
pub fn has_root_qdisc(json: &str, kind: &str) -> bool {
    match serde_json::from_str::<Vec<Qdisc>>(json) {
        Ok(qdiscs) => qdiscs.iter().any(|q| q.root && q.kind == kind),
        Err(e) => {
            debug!(error = %e, "unparseable tc output");
            false
        }
    }
}

/// Detach the shaping qdisc from every wireless and ethernet interface.
pub fn detach_qdiscs(ctx: &Context<'_>) -> Result<StepOutcome> {
    let mut outcomes = Vec::new();
    for iface in interfaces(&ctx.layout.net_class) {
        if !iface.kind.is_shaped() {
            continue;
        }
        let shown = match ctx
            .elevated("tc")
            .args(["-j", "qdisc", "show", "dev", iface.name.as_str()])
            .run(ctx.runner)
        {
            Ok(out) => out,
            Err(hifi_platform::Error::CommandNotFound { .. }) => {
                return Ok(StepOutcome::ignored("tc not available"));
            }
            Err(e) => return Err(e.into()),
        };
        if !shown.success() || !has_root_qdisc(&shown.stdout, SHAPER_QDISC) {
            outcomes.push(StepOutcome::ignored(format!("{}: no {SHAPER_QDISC} qdisc", iface.name)));
            continue;
        }

        let out = ctx
            .elevated("tc")
            .args(["qdisc", "del", "dev", iface.name.as_str(), "root"])
            .run(ctx.runner)?;
        if out.success() {
            info!(interface = %iface.name, "removed {SHAPER_QDISC} qdisc");
            outcomes.push(StepOutcome::done(format!("{}: qdisc removed", iface.name)));
        } else {
            warn!(interface = %iface.name, stderr = %out.stderr.trim(), "tc qdisc del failed");
            outcomes.push(StepOutcome::ignored(format!("{}: qdisc removal refused", iface.name)));
        }
    }
    if outcomes.is_empty() {
        return Ok(StepOutcome::ignored("no wireless or ethernet interfaces"));
    }
    Ok(StepOutcome::merge(outcomes))
}
