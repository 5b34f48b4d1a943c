//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - Flags given on the command line override values from the XML config.

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};
use crate::engine::ExtensionSet;

/// Canonical folder names and sequence-numbered files for scanned archive trees.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Rename scanned archive trees into canonical, sequence-numbered names"
)]
pub struct Args {
    /// Config file to use instead of $ARCHIVE_RENAME_CONFIG or the default location.
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<LogLevel>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        global = true,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Emit diagnostics in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, global = true, help = "Emit diagnostics in structured JSON")]
    pub json_logs: bool,

    /// Also write diagnostics to this file.
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub trace_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Rename directories, then sequence the files in every leaf directory.
    Run(RunArgs),
    /// Summarize a transaction log.
    Summary(SummaryArgs),
    /// Reverse the committed renames recorded in a transaction log.
    Undo(UndoArgs),
    /// Print which config file would be used, then exit.
    PrintConfig,
    /// Write a commented template config at the default location.
    InitConfig,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Root of the archive tree. The root itself is never renamed.
    #[arg(value_name = "ROOT", value_hint = ValueHint::DirPath)]
    pub root: PathBuf,

    /// Log what would happen without modifying the tree.
    #[arg(
        long,
        help = "Show what would be done, but do not modify files/directories"
    )]
    pub dry_run: bool,

    /// Deepest allowed file depth below the root (files directly in the root are 0).
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Allowed extension; repeat or comma-separate. Replaces the configured list.
    #[arg(long = "ext", value_name = "EXT", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Directory for the transaction log (default: the root).
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub log_dir: Option<PathBuf>,

    /// `_dupN` suffixes tried before a name collision is fatal.
    #[arg(long, value_name = "N")]
    pub max_collision_attempts: Option<u32>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SummaryArgs {
    /// Log file to summarize.
    #[arg(
        value_name = "LOG",
        value_hint = ValueHint::FilePath,
        required_unless_present = "last",
        conflicts_with = "last"
    )]
    pub log: Option<PathBuf>,

    /// Summarize the newest log instead of a named one.
    #[arg(long)]
    pub last: bool,

    /// Where `--last` looks (default: the configured log_dir, else the current dir).
    #[arg(long, value_name = "DIR", requires = "last", value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    /// Emit the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct UndoArgs {
    /// Transaction log of the run to reverse.
    #[arg(value_name = "LOG", value_hint = ValueHint::FilePath)]
    pub log: PathBuf,

    /// Report what would be restored without touching the tree.
    #[arg(long)]
    pub dry_run: bool,

    /// Move an occupying entry aside (`.bak_undo_<timestamp>`) instead of skipping the step.
    #[arg(long)]
    pub force: bool,

    /// Attempt at most N steps.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(tf) = &self.trace_file {
            cfg.trace_file = Some(tf.clone());
        }
        let Command::Run(run) = &self.command else {
            return;
        };
        if run.dry_run {
            cfg.dry_run = true;
        }
        if let Some(d) = run.max_depth {
            cfg.max_depth = d;
        }
        if !run.extensions.is_empty() {
            cfg.allowed_extensions = ExtensionSet::new(&run.extensions);
        }
        if let Some(dir) = &run.log_dir {
            cfg.log_dir = Some(dir.clone());
        }
        if let Some(n) = run.max_collision_attempts {
            cfg.max_collision_attempts = n;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
