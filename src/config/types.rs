//! Settings shared by the CLI and the engine.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::{DEFAULT_MAX_DEPTH, ExtensionSet, RunOptions};
use crate::fs_ops::DEFAULT_MAX_ATTEMPTS;

/// Console verbosity as users spell it in the config and on the command line.
/// Each step shows one tracing level more than the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Errors only
    Quiet,
    /// One line per phase plus warnings
    #[default]
    Normal,
    /// Every rename
    Info,
    Debug,
}

/// Accepted spellings, first one canonical.
const SPELLINGS: [(LogLevel, &[&str]); 4] = [
    (LogLevel::Quiet, &["quiet", "error", "none"]),
    (LogLevel::Normal, &["normal"]),
    (LogLevel::Info, &["info", "verbose", "detailed"]),
    (LogLevel::Debug, &["debug", "trace"]),
];

impl LogLevel {
    /// Case-insensitive lookup; `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        SPELLINGS
            .iter()
            .find(|(_, names)| names.contains(&wanted.as_str()))
            .map(|(level, _)| *level)
    }

    pub fn as_str(self) -> &'static str {
        SPELLINGS
            .iter()
            .find(|(level, _)| *level == self)
            .map_or("normal", |(_, names)| names[0])
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("unknown log level '{s}' (expected quiet, normal, info or debug)")
        })
    }
}

/// Runtime configuration: XML values with CLI overrides applied on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Deepest allowed file depth below the root
    pub max_depth: usize,
    pub allowed_extensions: ExtensionSet,
    /// `_dupN` suffixes tried before a collision is fatal
    pub max_collision_attempts: u32,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Where transaction logs go; `None` means the run root
    pub log_dir: Option<PathBuf>,
    /// Optional diagnostics file (tracing output, not the transaction log)
    pub trace_file: Option<PathBuf>,
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            allowed_extensions: ExtensionSet::default(),
            max_collision_attempts: DEFAULT_MAX_ATTEMPTS,
            log_level: LogLevel::Normal,
            log_dir: None,
            trace_file: None,
            dry_run: false,
        }
    }
}

impl Config {
    /// Engine inputs for one run over `root`.
    pub fn run_options(&self, root: PathBuf) -> RunOptions {
        RunOptions {
            root,
            dry_run: self.dry_run,
            max_depth: self.max_depth,
            allowed_extensions: self.allowed_extensions.clone(),
            max_collision_attempts: self.max_collision_attempts,
        }
    }
}
