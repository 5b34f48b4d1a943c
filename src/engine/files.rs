//! File phase: stage-then-commit renaming of allow-listed files, one directory at a time.
//!
//! For a batch, every renamed copy is staged before any original is touched. The
//! commit is a swap by rename: originals go to the aside area, staged copies are
//! renamed into their targets, and an original is deleted only once its replacement
//! sits at the final path. Any failure puts the original back by rename.
//!
//! Batch-level failures (copy, collision exhaustion, set-aside) abort only that
//! directory. Interruption is honoured before each copy and before the commit starts;
//! a commit always runs to the end of its batch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::options::{ExtensionSet, RunReport};
use super::staging::{StagingArea, StagingMapping};
use crate::errors::{RenameResult, RenamerError};
use crate::fs_ops::{EntryKind, Filesystem, WalkFilter, alternate_path, unique_path};
use crate::journal::{ActionKind, ErrorKind, TransactionLog};
use crate::naming::{NamingContext, natural_cmp};
use crate::shutdown;

pub struct FileRenameStager<'a> {
    root: &'a Path,
    extensions: &'a ExtensionSet,
    max_attempts: u32,
    filter: &'a WalkFilter,
}

enum Batch {
    Done,
    Aborted,
}

fn file_name_lossy(p: &Path) -> String {
    p.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl<'a> FileRenameStager<'a> {
    pub fn new(
        root: &'a Path,
        extensions: &'a ExtensionSet,
        max_attempts: u32,
        filter: &'a WalkFilter,
    ) -> Self {
        Self {
            root,
            extensions,
            max_attempts,
            filter,
        }
    }

    /// Directories holding allow-listed files, in path order, each with its files.
    pub fn leaf_batches(&self, fs: &dyn Filesystem) -> std::io::Result<BTreeMap<PathBuf, Vec<PathBuf>>> {
        let mut batches: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
        for entry in fs.entries_under(self.root, self.filter)? {
            if entry.kind != EntryKind::File || !self.extensions.matches(&entry.path) {
                continue;
            }
            if let Some(parent) = entry.path.parent() {
                batches.entry(parent.to_path_buf()).or_default().push(entry.path);
            }
        }
        Ok(batches)
    }

    /// Run every batch. Only an interruption or a failure to set up staging is fatal.
    pub fn run(
        &self,
        fs: &mut dyn Filesystem,
        log: &mut TransactionLog,
        report: &mut RunReport,
    ) -> RenameResult<()> {
        let batches = self.leaf_batches(&*fs)?;
        if batches.is_empty() {
            debug!("no allow-listed files");
            return Ok(());
        }
        let staging = StagingArea::create(fs, self.root)?;
        log.note(format!("STAGING {}", staging.path().display()));

        let mut result = Ok(());
        for (dir, files) in batches {
            if shutdown::is_requested() {
                log.failure(ErrorKind::Interrupted, &dir, None, "interrupted before directory");
                result = Err(RenamerError::Interrupted);
                break;
            }
            if let Err(e) = self.process_dir(fs, log, &staging, &dir, files, report) {
                result = Err(e);
                break;
            }
        }
        staging.dispose(fs, log);
        result
    }

    fn process_dir(
        &self,
        fs: &mut dyn Filesystem,
        log: &mut TransactionLog,
        staging: &StagingArea,
        dir: &Path,
        mut files: Vec<PathBuf>,
        report: &mut RunReport,
    ) -> RenameResult<()> {
        let rel = dir.strip_prefix(self.root).unwrap_or(Path::new(""));
        let ctx = NamingContext::from_relative(rel);
        files.sort_by(|a, b| natural_cmp(&file_name_lossy(a), &file_name_lossy(b)));

        let mut pending = Vec::new();
        for (i, file) in files.into_iter().enumerate() {
            let ext = file
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            let target = dir.join(ctx.file_name(i + 1, &ext));
            if file == target {
                log.action(ActionKind::Skipped, &file, None);
                report.files_skipped += 1;
            } else {
                pending.push((file, target));
            }
        }
        if pending.is_empty() {
            return Ok(());
        }

        let staged = self.stage(fs, log, staging, rel, pending, report);
        let outcome = match staged {
            Ok(Some(mappings)) if shutdown::is_requested() => {
                discard_copies(fs, log, &mappings);
                log.failure(ErrorKind::Interrupted, dir, None, "interrupted before commit");
                Err(RenamerError::Interrupted)
            }
            Ok(Some(mappings)) => Ok(self.commit(fs, log, staging, rel, &mappings, report)),
            Ok(None) => Ok(Batch::Aborted),
            Err(e) => Err(e),
        };
        staging.prune_empty(fs, rel);
        if let Ok(Batch::Aborted) = outcome {
            warn!(dir = %dir.display(), "directory batch aborted");
        }
        outcome.map(|_| ())
    }

    /// Copy every pending file into staging. `Ok(None)` means the batch was aborted
    /// and its copies removed.
    fn stage(
        &self,
        fs: &mut dyn Filesystem,
        log: &mut TransactionLog,
        staging: &StagingArea,
        rel: &Path,
        pending: Vec<(PathBuf, PathBuf)>,
        report: &mut RunReport,
    ) -> RenameResult<Option<Vec<StagingMapping>>> {
        let stage_dir = staging.files_dir(rel);
        if let Err(e) = fs.create_dir_all(&stage_dir) {
            log.failure(ErrorKind::Copy, &stage_dir, None, &e);
            let err = RenamerError::StageCopy { path: stage_dir, source: e };
            report.errors.push(err.to_string());
            return Ok(None);
        }

        let mut mappings: Vec<StagingMapping> = Vec::with_capacity(pending.len());
        for (original, target) in pending {
            if shutdown::is_requested() {
                discard_copies(fs, log, &mappings);
                log.failure(ErrorKind::Interrupted, &original, None, "interrupted while staging");
                return Err(RenamerError::Interrupted);
            }
            let wanted = stage_dir.join(target.file_name().unwrap_or_default());
            let staged = match unique_path(&*fs, &wanted, self.max_attempts) {
                Ok(p) => p,
                Err(e) => {
                    log.failure(ErrorKind::Collision, &original, Some(&wanted), &e);
                    report.errors.push(e.to_string());
                    discard_copies(fs, log, &mappings);
                    return Ok(None);
                }
            };
            if let Err(e) = fs.copy_file(&original, &staged) {
                log.failure(ErrorKind::Copy, &original, Some(&staged), &e);
                discard_copies(fs, log, &mappings);
                let err = RenamerError::StageCopy { path: original, source: e };
                report.errors.push(err.to_string());
                return Ok(None);
            }
            log.action(ActionKind::Copied, &original, Some(&staged));
            mappings.push(StagingMapping {
                original_path: original,
                staged_path: staged,
                final_target_path: target,
            });
        }
        Ok(Some(mappings))
    }

    fn commit(
        &self,
        fs: &mut dyn Filesystem,
        log: &mut TransactionLog,
        staging: &StagingArea,
        rel: &Path,
        mappings: &[StagingMapping],
        report: &mut RunReport,
    ) -> Batch {
        let aside_dir = staging.originals_dir(rel);
        if let Err(e) = fs.create_dir_all(&aside_dir) {
            log.failure(ErrorKind::Commit, &aside_dir, None, &e);
            report.errors.push(format!("{}: {e}", aside_dir.display()));
            discard_copies(fs, log, mappings);
            return Batch::Aborted;
        }

        // 1. set every original aside
        let mut asides: Vec<PathBuf> = Vec::with_capacity(mappings.len());
        for m in mappings {
            let aside = aside_dir.join(m.original_path.file_name().unwrap_or_default());
            match fs.rename(&m.original_path, &aside) {
                Ok(()) => {
                    log.action(ActionKind::SetAside, &m.original_path, Some(&aside));
                    asides.push(aside);
                }
                Err(e) => {
                    log.failure(ErrorKind::Commit, &m.original_path, Some(&aside), &e);
                    report.errors.push(format!("{}: {e}", m.original_path.display()));
                    for (done, aside) in mappings.iter().zip(&asides) {
                        restore_original(fs, log, aside, &done.original_path);
                    }
                    discard_copies(fs, log, mappings);
                    return Batch::Aborted;
                }
            }
        }

        // 2. move replacements in, 3. drop originals
        for (m, aside) in mappings.iter().zip(&asides) {
            match self.place(fs, m) {
                Ok(final_path) => {
                    log.action(ActionKind::RenamedFile, &m.original_path, Some(&final_path));
                    report.files_renamed += 1;
                    match fs.remove_file(aside) {
                        Ok(()) => log.action(ActionKind::RemovedOld, &m.original_path, Some(&final_path)),
                        Err(e) => {
                            log.failure(ErrorKind::Delete, aside, None, &e);
                            report.errors.push(format!("{}: {e}", aside.display()));
                        }
                    }
                }
                Err((attempted, e)) => {
                    log.failure(ErrorKind::Commit, &m.original_path, Some(&attempted), &e);
                    report.errors.push(format!("{}: {e}", m.original_path.display()));
                    restore_original(fs, log, aside, &m.original_path);
                    discard_copies(fs, log, std::slice::from_ref(m));
                }
            }
        }
        info!(dir = %rel.display(), files = asides.len(), "directory batch committed");
        Batch::Done
    }

    /// Rename the staged copy to its target, retrying once under an alternate name.
    fn place(
        &self,
        fs: &mut dyn Filesystem,
        m: &StagingMapping,
    ) -> Result<PathBuf, (PathBuf, RenamerError)> {
        let target = &m.final_target_path;
        let first = if fs.exists(target) {
            alternate_path(&*fs, target, self.max_attempts).map_err(|e| (target.clone(), e))?
        } else {
            target.clone()
        };
        let Err(first_err) = fs.rename(&m.staged_path, &first) else {
            return Ok(first);
        };
        warn!(target = %first.display(), error = %first_err, "commit rename failed, retrying with alternate name");
        let retry = alternate_path(&*fs, &first, self.max_attempts).map_err(|e| (first.clone(), e))?;
        match fs.rename(&m.staged_path, &retry) {
            Ok(()) => Ok(retry),
            Err(source) => Err((
                retry.clone(),
                RenamerError::Commit { path: retry, source },
            )),
        }
    }
}

fn restore_original(fs: &mut dyn Filesystem, log: &mut TransactionLog, aside: &Path, original: &Path) {
    match fs.rename(aside, original) {
        Ok(()) => log.action(ActionKind::RollbackFile, aside, Some(original)),
        Err(e) => log.failure(ErrorKind::Rollback, aside, Some(original), &e),
    }
}

/// Delete staged copies that never reached their target.
fn discard_copies(fs: &mut dyn Filesystem, log: &mut TransactionLog, mappings: &[StagingMapping]) {
    for m in mappings {
        if !fs.exists(&m.staged_path) {
            continue;
        }
        match fs.remove_file(&m.staged_path) {
            Ok(()) => log.action(ActionKind::RollbackCopy, &m.staged_path, None),
            Err(e) => log.failure(ErrorKind::Cleanup, &m.staged_path, None, &e),
        }
    }
}
