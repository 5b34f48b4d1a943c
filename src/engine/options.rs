//! Run inputs and the run report.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::fs_ops::DEFAULT_MAX_ATTEMPTS;

pub const DEFAULT_MAX_DEPTH: usize = 4;
pub const DEFAULT_EXTENSIONS: [&str; 6] = ["tif", "tiff", "jpg", "jpeg", "png", "pdf"];

/// Lowercased extensions without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    pub fn new<I, S>(exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            exts.into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    /// Parse a comma and/or whitespace separated list (`"jpg, tif .png"`).
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(|c: char| c == ',' || c.is_whitespace()))
    }

    /// Case-insensitive match on the path's extension.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.0.contains(&e.to_lowercase()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ExtensionSet {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}

impl fmt::Display for ExtensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list: Vec<&str> = self.iter().collect();
        f.write_str(&list.join(","))
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    pub dry_run: bool,
    pub max_depth: usize,
    pub allowed_extensions: ExtensionSet,
    pub max_collision_attempts: u32,
}

impl RunOptions {
    /// Defaults for everything except the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
            max_depth: DEFAULT_MAX_DEPTH,
            allowed_extensions: ExtensionSet::default(),
            max_collision_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// What a run did. File-phase failures are listed in `errors`; fatal failures are
/// returned as errors instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub dirs_renamed: usize,
    pub files_renamed: usize,
    pub files_skipped: usize,
    pub errors: Vec<String>,
    pub observed_depth: usize,
    pub dry_run: bool,
}
