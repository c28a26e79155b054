//! Platform detection and process plumbing for the hifi-wifi installer.
//!
//! Everything here is resolved once at startup and then passed around as
//! plain values: [`PlatformProfile`] for who and where we are, [`Command`]
//! plus a [`CommandRunner`] for every external process we spawn.

pub use command::{Command, CommandRunner, Output, Privilege, SystemRunner};
pub use error::{Error, Result};
pub use identity::{ActingUser, ElevationContext};
pub use os::{DistroKind, OsRelease};
pub use profile::PlatformProfile;

pub mod arch;
pub mod command;
pub mod env;
mod error;
pub mod identity;
pub mod os;
pub mod profile;
pub mod shell;
