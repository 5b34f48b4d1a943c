//! Staging subtree for the file phase.
//!
//! Layout under the run root:
//!
//! ```text
//! .archive_rename_staging_<pid>/
//!     files/<relative dir>/       renamed copies waiting for commit
//!     originals/<relative dir>/   originals set aside during the swap
//! ```
//!
//! Disposal removes `files/` unconditionally but only removes `originals/` when it
//! holds no files: an original that could not be put back is never deleted.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::fs_ops::{EntryKind, Filesystem, WalkFilter};
use crate::journal::{ErrorKind, TransactionLog};

/// File-name prefix of every staging root; walks prune it.
pub const STAGING_PREFIX: &str = ".archive_rename_staging_";

const FILES: &str = "files";
const ORIGINALS: &str = "originals";

/// One file of a batch between stage and commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingMapping {
    pub original_path: PathBuf,
    pub staged_path: PathBuf,
    pub final_target_path: PathBuf,
}

#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Create a fresh staging root in `run_root`. A leftover root with the same name
    /// (an earlier crashed run that had this pid) is left alone and a suffix is added.
    pub fn create(fs: &mut dyn Filesystem, run_root: &Path) -> io::Result<Self> {
        let base = format!("{STAGING_PREFIX}{}", std::process::id());
        let mut root = run_root.join(&base);
        let mut n = 2u32;
        while fs.exists(&root) {
            root = run_root.join(format!("{base}_{n}"));
            n += 1;
        }
        fs.create_dir_all(&root.join(FILES))?;
        fs.create_dir_all(&root.join(ORIGINALS))?;
        debug!(staging = %root.display(), "staging area created");
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn files_dir(&self, rel: &Path) -> PathBuf {
        self.root.join(FILES).join(rel)
    }

    pub fn originals_dir(&self, rel: &Path) -> PathBuf {
        self.root.join(ORIGINALS).join(rel)
    }

    /// Remove the now-empty staging directories of one batch. Best effort.
    pub fn prune_empty(&self, fs: &mut dyn Filesystem, rel: &Path) {
        for top in [FILES, ORIGINALS] {
            let stop = self.root.join(top);
            let mut dir = stop.join(rel);
            while dir != stop && dir.starts_with(&stop) {
                if fs.remove_dir(&dir).is_err() {
                    break;
                }
                match dir.parent() {
                    Some(p) => dir = p.to_path_buf(),
                    None => break,
                }
            }
        }
    }

    /// Tear the staging root down. Originals still in the aside area are kept and
    /// reported as `ERROR_CLEANUP`.
    pub fn dispose(self, fs: &mut dyn Filesystem, log: &mut TransactionLog) {
        let files = self.root.join(FILES);
        if fs.exists(&files)
            && let Err(e) = fs.remove_dir_all(&files)
        {
            log.failure(ErrorKind::Cleanup, &files, None, &e);
        }

        let originals = self.root.join(ORIGINALS);
        let stranded: Vec<PathBuf> = fs
            .entries_under(&originals, &WalkFilter::new())
            .map(|entries| {
                entries
                    .into_iter()
                    .filter(|e| e.kind == EntryKind::File)
                    .map(|e| e.path)
                    .collect()
            })
            .unwrap_or_default();
        if !stranded.is_empty() {
            for path in &stranded {
                log.failure(ErrorKind::Cleanup, path, None, "original kept in staging area");
            }
            warn!(count = stranded.len(), staging = %self.root.display(), "originals left in staging area");
            return;
        }
        if let Err(e) = fs.remove_dir_all(&self.root) {
            log.failure(ErrorKind::Cleanup, &self.root, None, &e);
        }
    }
}
