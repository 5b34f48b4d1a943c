//! Filesystem layer: the backend seam, dry-run simulation and collision resolution.

mod atomic;
mod backend;
pub mod collision;
pub mod helpers;
mod io_copy;
mod meta;
mod simulated;
mod util;

pub use backend::{EntryKind, Filesystem, PathEntry, RealFs, WalkFilter};
pub use collision::{DEFAULT_MAX_ATTEMPTS, alternate_path, unique_path};
pub use helpers::{io_context, io_error_with_help};
pub use simulated::SimulatedFs;
