//! Filesystem seam.
//!
//! Every engine phase observes and mutates the tree through [`Filesystem`]. [`RealFs`]
//! talks to the operating system; `SimulatedFs` replays the same calls against an
//! in-memory snapshot for dry runs. Tests wrap either to inject failures.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::atomic::rename_durable;
use super::helpers::io_context;
use super::io_copy::copy_durable;
use super::meta::carry_over_metadata;
use super::util::same_entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Dir,
    File,
}

/// A directory or regular file under the root. Symlinks are never entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Number of path components relative to the root (`root/a` is 1).
    pub depth: usize,
}

/// Paths every walk prunes: the staging area and the active log file.
#[derive(Debug, Clone, Default)]
pub struct WalkFilter {
    name_prefixes: Vec<String>,
    paths: Vec<PathBuf>,
}

impl WalkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prune any entry whose file name starts with `prefix`.
    pub fn skip_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefixes.push(prefix.into());
        self
    }

    /// Prune one exact path (and, for a directory, everything below it).
    pub fn skip_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Whether this entry itself is pruned.
    pub fn excludes(&self, path: &Path) -> bool {
        if self.paths.iter().any(|p| p == path) {
            return true;
        }
        let Some(name) = path.file_name().and_then(OsStr::to_str) else {
            return false;
        };
        self.name_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Whether `path` or any of its ancestors strictly below `root` is pruned.
    pub fn excludes_under(&self, root: &Path, path: &Path) -> bool {
        path.ancestors()
            .take_while(|a| *a != root && a.starts_with(root))
            .any(|a| self.excludes(a))
    }
}

/// Operations the engine needs from a filesystem.
pub trait Filesystem {
    /// True for backends that never touch the disk.
    fn is_simulated(&self) -> bool {
        false
    }

    fn exists(&self, path: &Path) -> bool;

    /// Whether both paths name one entry (case-only renames on case-insensitive volumes).
    fn same_entry(&self, a: &Path, b: &Path) -> bool;

    /// All directories and regular files below `root` (root excluded), sorted by path.
    fn entries_under(&self, root: &Path, filter: &WalkFilter) -> io::Result<Vec<PathEntry>>;

    /// Rename without replacing an existing destination.
    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copy a file to a new path; the copy is durable when this returns.
    fn copy_file(&mut self, from: &Path, to: &Path) -> io::Result<u64>;

    fn remove_file(&mut self, path: &Path) -> io::Result<()>;

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory.
    fn remove_dir(&mut self, path: &Path) -> io::Result<()>;

    fn remove_dir_all(&mut self, path: &Path) -> io::Result<()>;
}

/// The operating system's filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl Filesystem for RealFs {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn same_entry(&self, a: &Path, b: &Path) -> bool {
        same_entry(a, b)
    }

    fn entries_under(&self, root: &Path, filter: &WalkFilter) -> io::Result<Vec<PathEntry>> {
        let mut out = Vec::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !filter.excludes(e.path()));
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            let ft = entry.file_type();
            let kind = if ft.is_dir() {
                EntryKind::Dir
            } else if ft.is_file() {
                EntryKind::File
            } else {
                continue;
            };
            out.push(PathEntry {
                path: entry.path().to_path_buf(),
                kind,
                depth: entry.depth(),
            });
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        rename_durable(from, to)
    }

    fn copy_file(&mut self, from: &Path, to: &Path) -> io::Result<u64> {
        let meta = fs::metadata(from).map_err(io_context("stat", from))?;
        let bytes = copy_durable(from, to).map_err(io_context("copy", from))?;
        carry_over_metadata(to, &meta);
        Ok(bytes)
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).map_err(io_context("remove file", path))
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).map_err(io_context("create dir", path))
    }

    fn remove_dir(&mut self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path).map_err(io_context("remove dir", path))
    }

    fn remove_dir_all(&mut self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path).map_err(io_context("remove tree", path))
    }
}
