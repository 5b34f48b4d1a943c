//! Core library for `archive_rename`.
//!
//! Renames a scanned archive tree in two phases. Directories get canonical names
//! (`[a-z0-9._-]`, deepest first). Then the allowed files in every leaf directory get
//! sequence names derived from their ancestors (`<grandparent>_<parent>_nr_<dir>_NNNN.ext`).
//! Every action is recorded in an append-only transaction log. That log drives the
//! summary and undo commands.
//!
//! Module layout:
//! - `naming`: pure name computation (sanitizer, natural order, sequence names).
//! - `fs_ops`: the `Filesystem` seam, dry-run simulation, collision resolution.
//! - `engine`: depth check, directory phase with rollback, staged file phase.
//! - `journal`: transaction log, summary, undo.
//! - `config`, `cli`, `platform`, `output`, `shutdown`: ambient plumbing.

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs_ops;
pub mod journal;
pub mod naming;
pub mod output;
pub mod platform;
pub mod shutdown;
mod utils;

pub use config::{
    Config, LogLevel, create_template_config, default_config_path, load_config,
    load_config_from_xml_path, path_has_symlink_ancestor, resolve_config_path, validate_root,
};
pub use engine::{RunOptions, RunReport, run, run_with};
pub use errors::{RenameResult, RenamerError};
pub use journal::{LogEntry, TransactionLog};
pub use naming::sanitize;

/// Convenience imports for callers embedding the engine.
pub mod prelude {
    pub use crate::config::{Config, LogLevel, default_config_path, validate_root};
    pub use crate::engine::{ExtensionSet, RunOptions, RunReport, run, run_with};
    pub use crate::errors::{RenameResult as Result, RenamerError as Error};
    pub use crate::fs_ops::{Filesystem, RealFs, SimulatedFs};
    pub use crate::journal::{ActionKind, LogEntry, LogSummary, TransactionLog};
    pub use crate::naming::sanitize;
    pub use crate::shutdown::request as request_shutdown;
}
