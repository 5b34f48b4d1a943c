use archive_rename::engine::{RunOptions, STAGING_PREFIX, run_with};
use archive_rename::fs_ops::{Filesystem, PathEntry, RealFs, WalkFilter};
use archive_rename::journal::{ActionKind, ErrorKind, TransactionLog};
use assert_fs::TempDir;
use assert_fs::prelude::*;
use std::io;
use std::path::{Component, Path};

fn in_staging(p: &Path, part: &str) -> bool {
    let mut seen_root = false;
    for c in p.components() {
        if let Component::Normal(s) = c {
            let s = s.to_string_lossy();
            if s.starts_with(STAGING_PREFIX) {
                seen_root = true;
            } else if seen_root {
                return s == part;
            }
        }
    }
    false
}

/// Real filesystem with injected rename failures, selected by a predicate on (from, to).
struct Faulty<F: Fn(&Path, &Path) -> bool> {
    inner: RealFs,
    fails: F,
}

impl<F: Fn(&Path, &Path) -> bool> Filesystem for Faulty<F> {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }
    fn same_entry(&self, a: &Path, b: &Path) -> bool {
        self.inner.same_entry(a, b)
    }
    fn entries_under(&self, root: &Path, filter: &WalkFilter) -> io::Result<Vec<PathEntry>> {
        self.inner.entries_under(root, filter)
    }
    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        if (self.fails)(from, to) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "injected"));
        }
        self.inner.rename(from, to)
    }
    fn copy_file(&mut self, from: &Path, to: &Path) -> io::Result<u64> {
        self.inner.copy_file(from, to)
    }
    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        self.inner.remove_file(path)
    }
    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        self.inner.create_dir_all(path)
    }
    fn remove_dir(&mut self, path: &Path) -> io::Result<()> {
        self.inner.remove_dir(path)
    }
    fn remove_dir_all(&mut self, path: &Path) -> io::Result<()> {
        self.inner.remove_dir_all(path)
    }
}

#[test]
fn failed_commit_restores_the_original() {
    let td = TempDir::new().unwrap();
    td.child("box/a.jpg").write_str("alpha").unwrap();
    td.child("box/b.jpg").write_str("beta").unwrap();

    // every rename of b's staged copy into the tree fails (first try and retry)
    let mut fs_ = Faulty {
        inner: RealFs,
        fails: |from: &Path, _to: &Path| {
            in_staging(from, "files") && from.ends_with("x_x_nr_box_0002.jpg")
        },
    };
    let mut log = TransactionLog::in_memory(false);
    let report = run_with(&mut fs_, &RunOptions::new(td.path()), &mut log).unwrap();

    assert_eq!(report.files_renamed, 1);
    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    td.child("box/x_x_nr_box_0001.jpg").assert("alpha");
    td.child("box/b.jpg").assert("beta");
    assert!(!td.path().join("box/a.jpg").exists());

    assert_eq!(log.count(ActionKind::Error(ErrorKind::Commit)), 1);
    assert_eq!(log.count(ActionKind::RollbackFile), 1);
    assert_eq!(log.count(ActionKind::RemovedOld), 1);
    assert_eq!(log.count(ActionKind::Error(ErrorKind::Cleanup)), 0);
}

#[test]
fn failed_set_aside_leaves_the_directory_as_it_was() {
    let td = TempDir::new().unwrap();
    td.child("box/a.jpg").write_str("alpha").unwrap();
    td.child("box/b.jpg").write_str("beta").unwrap();
    td.child("box/c.jpg").write_str("gamma").unwrap();

    let mut fs_ = Faulty {
        inner: RealFs,
        fails: |from: &Path, to: &Path| in_staging(to, "originals") && from.ends_with("b.jpg"),
    };
    let mut log = TransactionLog::in_memory(false);
    let report = run_with(&mut fs_, &RunOptions::new(td.path()), &mut log).unwrap();

    assert_eq!(report.files_renamed, 0);
    assert_eq!(report.errors.len(), 1);
    td.child("box/a.jpg").assert("alpha");
    td.child("box/b.jpg").assert("beta");
    td.child("box/c.jpg").assert("gamma");
    assert_eq!(std::fs::read_dir(td.path().join("box")).unwrap().count(), 3);
    assert_eq!(log.count(ActionKind::SetAside), 1);
    assert_eq!(log.count(ActionKind::RollbackFile), 1);
    assert_eq!(log.count(ActionKind::RollbackCopy), 3);
}
