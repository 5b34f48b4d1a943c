//! Owner-only file handling for the transaction log, trace file and config.
//! On Unix new files are 0600 and the config directory is 0700. Windows relies on
//! the inherited ACL.

mod sibling;
#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{open_private_append, restrict_dir, restrict_file, write_private_new};

#[cfg(not(unix))]
pub use windows::{open_private_append, restrict_dir, restrict_file, write_private_new};
