//! Provisioning and removal of the hifi-wifi agent.
//!
//! The [`pipeline::Installer`] walks the install state machine; the
//! [`reversal::ReversalOrchestrator`] executes an [`reversal::UninstallPlan`].
//! Both receive everything they need through a [`Context`] and never read the
//! ambient environment mid-flow.

pub mod bootstrap;
pub mod build;
pub mod config;
mod context;
mod error;
pub mod guard;
pub mod hooks;
pub mod layout;
pub mod network;
mod outcome;
pub mod pipeline;
pub mod provision;
pub mod reboot;
pub mod reversal;
pub mod service;
pub mod shell_profile;
pub mod toolchain;

pub use config::{InstallerConfig, Timeouts};
pub use context::Context;
pub use error::{Error, FatalKind, Result};
pub use layout::Layout;
pub use outcome::StepOutcome;
pub use pipeline::{InstallReport, Installer, Stage};
pub use provision::ArtifactSource;
pub use reversal::{ReversalOrchestrator, UninstallPlan, UninstallReport};
pub use service::ServiceState;
