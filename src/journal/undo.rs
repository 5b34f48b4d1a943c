//! Reverse a run from its transaction log.
//!
//! The plan pairs every performed `RENAMED_FILE` and `RENAMED_DIR` entry (dry-run
//! lines and renames already cancelled by a `ROLLBACK_DIR` are ignored). Files are
//! restored first, newest first, then directories, newest first, so every path a
//! step needs still exists under the name the log recorded for it.

use chrono::Local;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::entry::{ActionKind, ErrorKind, LogEntry};
use super::log::TransactionLog;
use crate::errors::{RenameResult, RenamerError};
use crate::fs_ops::{DEFAULT_MAX_ATTEMPTS, Filesystem, io_context, unique_path};
use crate::shutdown;

/// Suffix given to an occupying entry that `--force` moves out of the way.
pub const BACKUP_MARKER: &str = ".bak_undo_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoKind {
    File,
    Dir,
}

/// One rename to reverse: move `from` (the current name) back to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoStep {
    pub kind: UndoKind,
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct UndoPlan {
    /// Root recorded by the run's opening note, if any.
    pub root: Option<PathBuf>,
    pub steps: Vec<UndoStep>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UndoOptions {
    pub dry_run: bool,
    pub force: bool,
    /// Cap on the number of steps attempted.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoReport {
    pub applied: usize,
    pub failed: usize,
    /// Steps left out by the limit or an interrupt.
    pub not_attempted: usize,
    pub backups: Vec<PathBuf>,
    pub interrupted: bool,
}

impl UndoPlan {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> Self {
        let mut root = None;
        let mut files = Vec::new();
        let mut dirs: Vec<UndoStep> = Vec::new();

        for e in entries {
            if e.dry_run {
                continue;
            }
            if root.is_none() {
                root = e.start_root();
            }
            let Some(dest) = e.destination_path() else {
                continue;
            };
            match e.kind {
                ActionKind::RenamedFile => files.push(UndoStep {
                    kind: UndoKind::File,
                    from: dest.to_path_buf(),
                    to: e.source_path().to_path_buf(),
                }),
                ActionKind::RenamedDir => dirs.push(UndoStep {
                    kind: UndoKind::Dir,
                    from: dest.to_path_buf(),
                    to: e.source_path().to_path_buf(),
                }),
                // ROLLBACK_DIR: new -> old, the inverse of an earlier RENAMED_DIR.
                ActionKind::RollbackDir => {
                    if let Some(i) = dirs
                        .iter()
                        .rposition(|s| s.from == e.source_path() && s.to == dest)
                    {
                        dirs.remove(i);
                    }
                }
                _ => {}
            }
        }

        files.reverse();
        dirs.reverse();
        files.extend(dirs);
        UndoPlan { root, steps: files }
    }

    /// Plan from a log file; malformed lines abort with their line number.
    pub fn from_path(path: &Path) -> RenameResult<Self> {
        let file = File::open(path).map_err(io_context("open log", path))?;
        let mut entries = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            match LogEntry::parse_line(&line) {
                Ok(Some(e)) => entries.push(e),
                Ok(None) => {}
                Err(reason) => return Err(RenamerError::LogParse { line: i + 1, reason }),
            }
        }
        Ok(Self::from_entries(&entries))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// `<dir>/undo_<log stem>_<YYYYmmdd_HHMMSS>.log`, next to the log being undone.
pub fn undo_log_path(source_log: &Path) -> PathBuf {
    let stem = source_log
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let name = format!("undo_{stem}_{stamp}.log");
    match source_log.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

fn backup_path(fs: &dyn Filesystem, occupied: &Path) -> RenameResult<PathBuf> {
    let name = occupied
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let candidate = occupied.with_file_name(format!("{name}{BACKUP_MARKER}{stamp}"));
    unique_path(fs, &candidate, DEFAULT_MAX_ATTEMPTS)
}

fn undo_one(
    fs: &mut dyn Filesystem,
    step: &UndoStep,
    force: bool,
    backups: &mut Vec<PathBuf>,
) -> Result<(), String> {
    if !fs.exists(&step.from) {
        return Err("current path no longer exists".to_string());
    }
    if fs.exists(&step.to) {
        if !force {
            return Err("original path is occupied (use --force to back it up)".to_string());
        }
        let backup = backup_path(fs, &step.to).map_err(|e| e.to_string())?;
        fs.rename(&step.to, &backup)
            .map_err(|e| format!("backup of occupying entry failed: {e}"))?;
        debug!(occupied = %step.to.display(), backup = %backup.display(), "moved occupying entry aside");
        backups.push(backup);
    }
    if let Some(parent) = step.to.parent()
        && !fs.exists(parent)
    {
        fs.create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    fs.rename(&step.from, &step.to).map_err(|e| e.to_string())
}

/// Apply `plan` through `fs`, recording every step in `log`. Individual failures are
/// logged as `ERROR_UNDO` and do not stop the remaining steps.
pub fn apply_undo(
    fs: &mut dyn Filesystem,
    plan: &UndoPlan,
    opts: &UndoOptions,
    log: &mut TransactionLog,
) -> UndoReport {
    let mut report = UndoReport::default();
    let budget = opts.limit.unwrap_or(usize::MAX).min(plan.steps.len());
    log.note(format!("UNDO START steps={} limit={budget}", plan.steps.len()));

    for (i, step) in plan.steps.iter().take(budget).enumerate() {
        if shutdown::is_requested() {
            report.interrupted = true;
            report.not_attempted = plan.steps.len() - i;
            log.failure(ErrorKind::Interrupted, &step.from, None, "undo interrupted");
            warn!(remaining = report.not_attempted, "undo interrupted");
            return report;
        }
        match undo_one(fs, step, opts.force, &mut report.backups) {
            Ok(()) => {
                let kind = match step.kind {
                    UndoKind::File => ActionKind::UndoFile,
                    UndoKind::Dir => ActionKind::UndoDir,
                };
                log.action(kind, &step.from, Some(&step.to));
                report.applied += 1;
            }
            Err(reason) => {
                log.failure(ErrorKind::Undo, &step.from, Some(&step.to), reason);
                report.failed += 1;
            }
        }
    }
    report.not_attempted = plan.steps.len() - budget;
    log.note(format!(
        "UNDO FINISHED applied={} failed={}",
        report.applied, report.failed
    ));
    info!(
        applied = report.applied,
        failed = report.failed,
        not_attempted = report.not_attempted,
        dry_run = opts.dry_run,
        "undo finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_ops::{EntryKind, SimulatedFs};

    fn entries(text: &str) -> Vec<LogEntry> {
        text.lines()
            .filter_map(|l| LogEntry::parse_line(l).unwrap())
            .collect()
    }

    const RUN: &str = "\
2024-05-01T10:00:00.000000 NOTE: START max_depth=4 root=/r
2024-05-01T10:00:01.000000 RENAMED_DIR: /r/Box A -> /r/box_a
2024-05-01T10:00:02.000000 RENAMED_DIR: /r/Box B -> /r/box_b
2024-05-01T10:00:03.000000 ROLLBACK_DIR: /r/box_b -> /r/Box B
2024-05-01T10:00:04.000000 DRY: RENAMED_FILE: /r/box_a/q.jpg -> /r/box_a/z.jpg
2024-05-01T10:00:05.000000 RENAMED_FILE: /r/box_a/a.jpg -> /r/box_a/x_x_nr_box_a_0001.jpg
2024-05-01T10:00:06.000000 RENAMED_FILE: /r/box_a/b.jpg -> /r/box_a/x_x_nr_box_a_0002.jpg
";

    #[test]
    fn plan_orders_files_then_dirs_newest_first() {
        let plan = UndoPlan::from_entries(&entries(RUN));
        assert_eq!(plan.root.as_deref(), Some(Path::new("/r")));
        let froms: Vec<_> = plan.steps.iter().map(|s| s.from.display().to_string()).collect();
        assert_eq!(
            froms,
            [
                "/r/box_a/x_x_nr_box_a_0002.jpg",
                "/r/box_a/x_x_nr_box_a_0001.jpg",
                "/r/box_a",
            ]
        );
    }

    fn renamed_tree() -> SimulatedFs {
        let mut sim = SimulatedFs::new("/r");
        sim.insert("/r/box_a/x_x_nr_box_a_0001.jpg", EntryKind::File);
        sim.insert("/r/box_a/x_x_nr_box_a_0002.jpg", EntryKind::File);
        sim
    }

    #[test]
    fn apply_restores_original_names() {
        let plan = UndoPlan::from_entries(&entries(RUN));
        let mut sim = renamed_tree();
        let mut log = TransactionLog::in_memory(false);
        let report = apply_undo(&mut sim, &plan, &UndoOptions::default(), &mut log);
        assert_eq!(report.applied, 3);
        assert_eq!(report.failed, 0);
        assert!(sim.exists(Path::new("/r/Box A/a.jpg")));
        assert!(sim.exists(Path::new("/r/Box A/b.jpg")));
        assert_eq!(log.count(ActionKind::UndoFile), 2);
        assert_eq!(log.count(ActionKind::UndoDir), 1);
    }

    #[test]
    fn occupied_target_needs_force() {
        let plan = UndoPlan::from_entries(&entries(RUN));
        let mut sim = renamed_tree();
        sim.insert("/r/box_a/b.jpg", EntryKind::File);
        let mut log = TransactionLog::in_memory(false);
        let report = apply_undo(&mut sim, &plan, &UndoOptions::default(), &mut log);
        assert_eq!(report.failed, 1);
        assert_eq!(log.count(ActionKind::Error(ErrorKind::Undo)), 1);

        let mut sim = renamed_tree();
        sim.insert("/r/box_a/b.jpg", EntryKind::File);
        let opts = UndoOptions { force: true, ..Default::default() };
        let report = apply_undo(&mut sim, &plan, &opts, &mut TransactionLog::in_memory(false));
        assert_eq!(report.failed, 0);
        assert_eq!(report.backups.len(), 1);
        let backup = report.backups[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(backup.starts_with("b.jpg.bak_undo_"), "{backup}");
    }

    #[test]
    fn limit_caps_attempts() {
        let plan = UndoPlan::from_entries(&entries(RUN));
        let mut sim = renamed_tree();
        let opts = UndoOptions { limit: Some(1), ..Default::default() };
        let report = apply_undo(&mut sim, &plan, &opts, &mut TransactionLog::in_memory(false));
        assert_eq!(report.applied, 1);
        assert_eq!(report.not_attempted, 2);
        assert!(sim.exists(Path::new("/r/box_a/b.jpg")));
    }

    #[test]
    fn undo_log_sits_next_to_source() {
        let p = undo_log_path(Path::new("/logs/archive_rename_log_20240101_090000.log"));
        let name = p.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(p.parent(), Some(Path::new("/logs")));
        assert!(name.starts_with("undo_archive_rename_log_20240101_090000_"), "{name}");
    }
}
