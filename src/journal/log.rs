//! Append-only transaction log.
//!
//! Every attempted or performed action becomes one line, flushed immediately so a
//! crash leaves a usable log. Entries are also kept in memory for the run report and
//! mirrored as tracing events. A failed write is reported and counted, never fatal.

use chrono::{Local, SubsecRound};
use std::fmt::Display;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::entry::{ActionKind, ErrorKind, LogEntry};
use crate::platform::open_private_append;

pub const LOG_FILE_PREFIX: &str = "archive_rename_log_";

pub struct TransactionLog {
    sink: Box<dyn Write + Send>,
    path: Option<PathBuf>,
    dry_run: bool,
    entries: Vec<LogEntry>,
    write_failures: usize,
}

impl std::fmt::Debug for TransactionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLog")
            .field("path", &self.path)
            .field("dry_run", &self.dry_run)
            .field("entries", &self.entries.len())
            .field("write_failures", &self.write_failures)
            .finish()
    }
}

impl TransactionLog {
    /// Create `archive_rename_log_<YYYYmmdd_HHMMSS>.log` in `dir` (a numeric
    /// suffix is added when a log with that name already exists).
    pub fn create_in(dir: &Path, dry_run: bool) -> io::Result<Self> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut path = dir.join(format!("{LOG_FILE_PREFIX}{stamp}.log"));
        let mut n = 2u32;
        while path.exists() {
            path = dir.join(format!("{LOG_FILE_PREFIX}{stamp}_{n}.log"));
            n += 1;
        }
        Self::open(&path, dry_run)
    }

    /// Append to `path` (created 0600 on Unix).
    pub fn open(path: &Path, dry_run: bool) -> io::Result<Self> {
        let file: File = open_private_append(path)?;
        Ok(Self {
            sink: Box::new(file),
            path: Some(path.to_path_buf()),
            dry_run,
            entries: Vec::new(),
            write_failures: 0,
        })
    }

    /// Log into an arbitrary writer (no backing file).
    pub fn with_writer(writer: impl Write + Send + 'static, dry_run: bool) -> Self {
        Self {
            sink: Box::new(writer),
            path: None,
            dry_run,
            entries: Vec::new(),
            write_failures: 0,
        }
    }

    /// Entries are kept in memory only.
    pub fn in_memory(dry_run: bool) -> Self {
        Self::with_writer(io::sink(), dry_run)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn write_failures(&self) -> usize {
        self.write_failures
    }

    /// Number of entries of `kind` written so far.
    pub fn count(&self, kind: ActionKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// A performed (or, in a dry run, hypothetical) action.
    pub fn action(&mut self, kind: ActionKind, source: &Path, destination: Option<&Path>) {
        match destination {
            Some(d) => info!(action = %kind, dry_run = self.dry_run, src = %source.display(), dest = %d.display(), "transaction"),
            None => info!(action = %kind, dry_run = self.dry_run, src = %source.display(), "transaction"),
        }
        self.push(kind, source.display().to_string(), destination, None);
    }

    /// A failed action with its reason.
    pub fn failure(
        &mut self,
        kind: ErrorKind,
        source: &Path,
        destination: Option<&Path>,
        detail: impl Display,
    ) {
        let detail = detail.to_string().replace(['\n', '\r'], " ");
        warn!(action = %ActionKind::Error(kind), dry_run = self.dry_run, src = %source.display(), dest = %destination.map(|d| d.display().to_string()).unwrap_or_default(), error = %detail, "transaction failed");
        self.push(
            ActionKind::Error(kind),
            source.display().to_string(),
            destination,
            Some(detail),
        );
    }

    /// Free-text line (run start/finish, depth report, staging creation).
    pub fn note(&mut self, text: impl Display) {
        let text = text.to_string().replace(['\n', '\r'], " ");
        debug!(dry_run = self.dry_run, "{text}");
        self.push(ActionKind::Note, text, None, None);
    }

    fn push(
        &mut self,
        kind: ActionKind,
        source: String,
        destination: Option<&Path>,
        detail: Option<String>,
    ) {
        let entry = LogEntry {
            timestamp: Local::now().naive_local().trunc_subsecs(6),
            dry_run: self.dry_run,
            kind,
            source,
            destination: destination.map(|d| d.display().to_string()),
            detail,
        };
        let written = writeln!(self.sink, "{entry}").and_then(|_| self.sink.flush());
        if let Err(e) = written {
            self.write_failures += 1;
            warn!(error = %e, log = ?self.path, "failed to write transaction log line");
        }
        self.entries.push(entry);
    }
}
