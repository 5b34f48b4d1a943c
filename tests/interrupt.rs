use archive_rename::engine::{RunOptions, STAGING_PREFIX, run, run_with};
use archive_rename::fs_ops::{Filesystem, PathEntry, RealFs, WalkFilter};
use archive_rename::journal::{ActionKind, ErrorKind, TransactionLog};
use archive_rename::{RenamerError, shutdown};
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serial_test::serial;
use std::io;
use std::path::Path;

fn no_staging_left(root: &Path) -> bool {
    std::fs::read_dir(root)
        .unwrap()
        .filter_map(|e| e.ok())
        .all(|e| !e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
}

/// Requests shutdown right after the first staged copy, like a Ctrl-C mid-batch.
struct InterruptAfterFirstCopy(RealFs);

impl Filesystem for InterruptAfterFirstCopy {
    fn exists(&self, path: &Path) -> bool {
        self.0.exists(path)
    }
    fn same_entry(&self, a: &Path, b: &Path) -> bool {
        self.0.same_entry(a, b)
    }
    fn entries_under(&self, root: &Path, filter: &WalkFilter) -> io::Result<Vec<PathEntry>> {
        self.0.entries_under(root, filter)
    }
    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        self.0.rename(from, to)
    }
    fn copy_file(&mut self, from: &Path, to: &Path) -> io::Result<u64> {
        let n = self.0.copy_file(from, to)?;
        shutdown::request();
        Ok(n)
    }
    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        self.0.remove_file(path)
    }
    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        self.0.create_dir_all(path)
    }
    fn remove_dir(&mut self, path: &Path) -> io::Result<()> {
        self.0.remove_dir(path)
    }
    fn remove_dir_all(&mut self, path: &Path) -> io::Result<()> {
        self.0.remove_dir_all(path)
    }
}

#[test]
#[serial]
fn interrupt_before_directory_phase_renames_nothing() {
    shutdown::reset();
    let td = TempDir::new().unwrap();
    td.child("Box 1/a.jpg").write_str("a").unwrap();

    shutdown::request();
    let mut log = TransactionLog::in_memory(false);
    let err = run(&RunOptions::new(td.path()), &mut log).unwrap_err();
    shutdown::reset();

    assert!(matches!(err, RenamerError::Interrupted), "{err:?}");
    td.child("Box 1/a.jpg").assert("a");
    assert_eq!(log.count(ActionKind::Error(ErrorKind::Interrupted)), 1);
}

#[test]
#[serial]
fn interrupt_while_staging_discards_copies() {
    shutdown::reset();
    let td = TempDir::new().unwrap();
    td.child("box/a.jpg").write_str("a").unwrap();
    td.child("box/b.jpg").write_str("b").unwrap();

    let mut fs_ = InterruptAfterFirstCopy(RealFs);
    let mut log = TransactionLog::in_memory(false);
    let err = run_with(&mut fs_, &RunOptions::new(td.path()), &mut log).unwrap_err();
    shutdown::reset();

    assert_eq!(err.code(), 130);
    td.child("box/a.jpg").assert("a");
    td.child("box/b.jpg").assert("b");
    assert_eq!(std::fs::read_dir(td.path().join("box")).unwrap().count(), 2);
    assert!(no_staging_left(td.path()));
    assert_eq!(log.count(ActionKind::Copied), 1);
    assert_eq!(log.count(ActionKind::RollbackCopy), 1);
    assert_eq!(log.count(ActionKind::SetAside), 0);
}

#[test]
#[serial]
fn directory_renames_before_interrupt_stay() {
    shutdown::reset();
    let td = TempDir::new().unwrap();
    td.child("Box 1/a.jpg").write_str("a").unwrap();

    // the single file batch is staged (triggering the interrupt) after the rename of "Box 1"
    let mut fs_ = InterruptAfterFirstCopy(RealFs);
    let mut log = TransactionLog::in_memory(false);
    let err = run_with(&mut fs_, &RunOptions::new(td.path()), &mut log).unwrap_err();
    shutdown::reset();

    assert!(matches!(err, RenamerError::Interrupted));
    td.child("box_1/a.jpg").assert("a");
    assert!(!td.path().join("Box 1").exists());
    assert!(no_staging_left(td.path()));
    assert_eq!(log.count(ActionKind::RollbackDir), 0);
}
