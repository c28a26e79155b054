//! Filesystem primitives used by the installer and its reversal.
//!
//! Writes go through a temporary file in the destination directory followed
//! by a rename, so readers never observe a half-written file. Removals report
//! whether anything was there, which is what lets teardown treat absence as
//! success.

mod error;
pub mod permissions;
pub mod primitives;

pub use error::{Error, Result};
pub use permissions::{Ownership, PermissionMode};
pub use primitives::{
    AtomicWriteOptions, Removal, atomic_copy, atomic_read, atomic_write, link_exists, remove_path,
    symlink,
};
