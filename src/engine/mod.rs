//! The rename engine: depth check, directory phase, file phase.
//!
//! [`run`] picks the backend (the real filesystem, or an in-memory snapshot of the
//! root for dry runs) and hands it to [`run_with`], so both modes execute the same
//! code path and differ only in whether anything touches the disk.

pub mod depth;
pub mod directories;
pub mod files;
mod options;
pub mod staging;

use tracing::{error, info};

use crate::errors::RenameResult;
use crate::fs_ops::{Filesystem, RealFs, SimulatedFs, WalkFilter};
use crate::journal::{ErrorKind, LogEntry, TransactionLog};

pub use depth::DepthCheck;
pub use directories::{DirectoryRenamer, RenameRecord, RenamerState};
pub use files::FileRenameStager;
pub use options::{DEFAULT_EXTENSIONS, DEFAULT_MAX_DEPTH, ExtensionSet, RunOptions, RunReport};
pub use staging::{STAGING_PREFIX, StagingArea, StagingMapping};

/// Run against the real tree, or a snapshot of it when `opts.dry_run` is set.
pub fn run(opts: &RunOptions, log: &mut TransactionLog) -> RenameResult<RunReport> {
    if opts.dry_run {
        let mut sim = SimulatedFs::snapshot(&opts.root)?;
        run_with(&mut sim, opts, log)
    } else {
        run_with(&mut RealFs, opts, log)
    }
}

/// Walk filter for a run: staging roots and the active log file are never entries.
pub fn walk_filter(log: &TransactionLog) -> WalkFilter {
    let filter = WalkFilter::new().skip_name_prefix(STAGING_PREFIX);
    match log.path() {
        Some(p) => filter.skip_path(p),
        None => filter,
    }
}

pub fn run_with(
    fs: &mut dyn Filesystem,
    opts: &RunOptions,
    log: &mut TransactionLog,
) -> RenameResult<RunReport> {
    let root = opts.root.as_path();
    let filter = walk_filter(log);
    let mut report = RunReport {
        dry_run: opts.dry_run,
        ..RunReport::default()
    };
    log.note(LogEntry::start_note_text(root, opts.max_depth));
    info!(root = %root.display(), dry_run = opts.dry_run, max_depth = opts.max_depth, "run started");

    let check = depth::check(&*fs, root, opts.max_depth, &filter)?;
    report.observed_depth = check.observed_max;
    log.note(format!(
        "DEPTH observed={} limit={}",
        check.observed_max, check.limit
    ));
    if !check.ok() {
        let err = check.to_error(root);
        log.failure(
            ErrorKind::Depth,
            check.deepest.as_deref().unwrap_or(root),
            None,
            &err,
        );
        error!(observed = check.observed_max, limit = check.limit, "depth limit exceeded, nothing renamed");
        return Err(err);
    }

    let mut renamer =
        DirectoryRenamer::scan(&*fs, root, &filter, opts.max_collision_attempts)?;
    if let Err(e) = renamer.rename_all(fs, log) {
        if renamer.state() == RenamerState::Failed {
            let failed = renamer.rollback(fs, log);
            error!(error = %e, rollback_failures = failed, "directory phase failed and was rolled back");
        }
        return Err(e);
    }
    report.dirs_renamed = renamer.renamed();

    let stager = FileRenameStager::new(
        root,
        &opts.allowed_extensions,
        opts.max_collision_attempts,
        &filter,
    );
    stager.run(fs, log, &mut report)?;

    log.note(format!(
        "FINISHED dirs_renamed={} files_renamed={} files_skipped={} errors={}",
        report.dirs_renamed,
        report.files_renamed,
        report.files_skipped,
        report.errors.len()
    ));
    info!(
        dirs = report.dirs_renamed,
        files = report.files_renamed,
        skipped = report.files_skipped,
        errors = report.errors.len(),
        "run finished"
    );
    Ok(report)
}
