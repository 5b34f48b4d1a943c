//! Directory phase: canonicalize directory names deepest-first, with rollback.
//!
//! Directories are collected up front and ordered by descending depth, then by path
//! bytes, so a child is always renamed while its parent still has the name it was
//! collected under. A failed rename leaves the renamer in [`RenamerState::Failed`];
//! the caller decides to call [`DirectoryRenamer::rollback`], which replays the
//! records new->old.

use chrono::{DateTime, Local};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

use crate::errors::{RenameResult, RenamerError};
use crate::fs_ops::{EntryKind, Filesystem, WalkFilter, alternate_path};
use crate::journal::{ActionKind, ErrorKind, TransactionLog};
use crate::naming::sanitize;
use crate::shutdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenamerState {
    Scanned,
    Renaming,
    Committed,
    Failed,
    RolledBack,
    Interrupted,
}

/// A performed rename, kept so it can be reversed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRecord {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub kind: EntryKind,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug)]
pub struct DirectoryRenamer {
    dirs: Vec<PathBuf>,
    max_attempts: u32,
    state: RenamerState,
    records: Vec<RenameRecord>,
    renamed: usize,
}

fn path_bytes(p: &Path) -> &[u8] {
    p.as_os_str().as_encoded_bytes()
}

impl DirectoryRenamer {
    /// Collect every directory under `root` (the root itself is never renamed).
    pub fn scan(
        fs: &dyn Filesystem,
        root: &Path,
        filter: &WalkFilter,
        max_attempts: u32,
    ) -> io::Result<Self> {
        let mut dirs: Vec<_> = fs
            .entries_under(root, filter)?
            .into_iter()
            .filter(|e| e.kind == EntryKind::Dir)
            .collect();
        dirs.sort_by(|a, b| {
            b.depth
                .cmp(&a.depth)
                .then_with(|| path_bytes(&a.path).cmp(path_bytes(&b.path)))
        });
        debug!(count = dirs.len(), root = %root.display(), "directories collected");
        Ok(Self {
            dirs: dirs.into_iter().map(|e| e.path).collect(),
            max_attempts,
            state: RenamerState::Scanned,
            records: Vec::new(),
            renamed: 0,
        })
    }

    pub fn state(&self) -> RenamerState {
        self.state
    }

    /// Processing order.
    pub fn directories(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Renames that can still be rolled back (none for simulated backends).
    pub fn records(&self) -> &[RenameRecord] {
        &self.records
    }

    /// Renames performed, simulated ones included.
    pub fn renamed(&self) -> usize {
        self.renamed
    }

    /// Rename every directory whose name is not canonical. Stops at the first failure.
    pub fn rename_all(
        &mut self,
        fs: &mut dyn Filesystem,
        log: &mut TransactionLog,
    ) -> RenameResult<()> {
        self.state = RenamerState::Renaming;
        let dirs = std::mem::take(&mut self.dirs);
        let mut result = Ok(());
        for dir in &dirs {
            result = self.rename_one(fs, log, dir);
            if result.is_err() {
                break;
            }
        }
        self.dirs = dirs;
        if result.is_ok() {
            self.state = RenamerState::Committed;
            info!(renamed = self.renamed, "directory phase committed");
        }
        result
    }

    fn rename_one(
        &mut self,
        fs: &mut dyn Filesystem,
        log: &mut TransactionLog,
        dir: &Path,
    ) -> RenameResult<()> {
        if shutdown::is_requested() {
            self.state = RenamerState::Interrupted;
            log.failure(ErrorKind::Interrupted, dir, None, "interrupted during directory phase");
            return Err(RenamerError::Interrupted);
        }
        let Some(name) = dir.file_name() else {
            return Ok(());
        };
        let canonical = sanitize(&name.to_string_lossy());
        if name == canonical.as_str() {
            trace!(dir = %dir.display(), "already canonical");
            return Ok(());
        }

        let mut target = dir.with_file_name(&canonical);
        if fs.exists(&target) && !fs.same_entry(dir, &target) {
            target = match alternate_path(&*fs, &target, self.max_attempts) {
                Ok(p) => p,
                Err(e) => {
                    self.state = RenamerState::Failed;
                    log.failure(ErrorKind::DirRename, dir, Some(&target), &e);
                    return Err(e);
                }
            };
            debug!(dir = %dir.display(), target = %target.display(), "directory name taken, using alternate");
        }

        if let Err(source) = fs.rename(dir, &target) {
            self.state = RenamerState::Failed;
            log.failure(ErrorKind::DirRename, dir, Some(&target), &source);
            return Err(RenamerError::DirectoryRename {
                from: dir.to_path_buf(),
                to: target,
                source,
            });
        }
        log.action(ActionKind::RenamedDir, dir, Some(&target));
        self.renamed += 1;
        if !fs.is_simulated() {
            self.records.push(RenameRecord {
                old_path: dir.to_path_buf(),
                new_path: target,
                kind: EntryKind::Dir,
                timestamp: Local::now(),
            });
        }
        Ok(())
    }

    /// Undo the recorded renames in reverse. Each step is independent; returns the
    /// number of steps that failed.
    pub fn rollback(&mut self, fs: &mut dyn Filesystem, log: &mut TransactionLog) -> usize {
        let mut failed = 0;
        for rec in self.records.drain(..).rev() {
            match fs.rename(&rec.new_path, &rec.old_path) {
                Ok(()) => log.action(ActionKind::RollbackDir, &rec.new_path, Some(&rec.old_path)),
                Err(e) => {
                    failed += 1;
                    log.failure(ErrorKind::Rollback, &rec.new_path, Some(&rec.old_path), &e);
                }
            }
        }
        if failed > 0 {
            warn!(failed, "directory rollback incomplete");
        }
        self.state = RenamerState::RolledBack;
        failed
    }
}
