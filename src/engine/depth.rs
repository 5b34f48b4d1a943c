//! Depth precondition.
//!
//! A file's depth is the number of directories between the root and the directory
//! that holds it, so `root/f.jpg` is 0 and `root/a/b/f.jpg` is 2.

use std::io;
use std::path::{Path, PathBuf};

use crate::errors::RenamerError;
use crate::fs_ops::{EntryKind, Filesystem, WalkFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthCheck {
    pub observed_max: usize,
    pub limit: usize,
    /// First file (in path order) found at `observed_max`.
    pub deepest: Option<PathBuf>,
}

impl DepthCheck {
    pub fn ok(&self) -> bool {
        self.observed_max <= self.limit
    }

    pub fn to_error(&self, root: &Path) -> RenamerError {
        RenamerError::DepthExceeded {
            observed: self.observed_max,
            limit: self.limit,
            deepest: self.deepest.clone().unwrap_or_else(|| root.to_path_buf()),
        }
    }
}

/// Walk the tree once, read-only, and report the deepest file.
pub fn check(
    fs: &dyn Filesystem,
    root: &Path,
    max_depth: usize,
    filter: &WalkFilter,
) -> io::Result<DepthCheck> {
    let mut result = DepthCheck {
        observed_max: 0,
        limit: max_depth,
        deepest: None,
    };
    for entry in fs.entries_under(root, filter)? {
        if entry.kind != EntryKind::File {
            continue;
        }
        let depth = entry.depth.saturating_sub(1);
        if result.deepest.is_none() || depth > result.observed_max {
            result.observed_max = depth;
            result.deepest = Some(entry.path);
        }
    }
    Ok(result)
}
