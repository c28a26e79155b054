pub mod remove;
pub mod rw;
pub mod symlink;

pub use remove::{Removal, remove_path};
pub use rw::{AtomicWriteOptions, atomic_copy, atomic_read, atomic_write};
pub use symlink::{link_exists, symlink};
