//! Collision resolution by `_dup{N}` suffixing.
//!
//! `scan.jpg` -> `scan_dup1.jpg`, `scan_dup2.jpg`, ...; `folder` -> `folder_dup1`.
//! The suffix goes before the last extension. Stems are truncated so candidates stay
//! within the platform's file-name budget.
//!
//! Resolution looks only at current state through the [`Filesystem`]; the engine is the
//! single writer of the tree, so a free candidate stays free until it is used.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::trace;

use super::backend::Filesystem;
use crate::errors::{RenameResult, RenamerError};

pub const DUP_MARKER: &str = "_dup";

/// Default number of suffixes tried before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 9999;

#[cfg(windows)]
const MAX_FILENAME_LEN: usize = 240;
#[cfg(not(windows))]
const MAX_FILENAME_LEN: usize = 255;

/// `target` itself when free, else the first free `_dup{N}` candidate.
pub fn unique_path<F: Filesystem + ?Sized>(
    fs: &F,
    target: &Path,
    max_attempts: u32,
) -> RenameResult<PathBuf> {
    if !fs.exists(target) {
        return Ok(target.to_path_buf());
    }
    alternate_path(fs, target, max_attempts)
}

/// The first free `_dup{N}` candidate, never `target` itself.
pub fn alternate_path<F: Filesystem + ?Sized>(
    fs: &F,
    target: &Path,
    max_attempts: u32,
) -> RenameResult<PathBuf> {
    for n in 1..=max_attempts {
        let candidate = dup_candidate(target, n);
        if !fs.exists(&candidate) {
            return Ok(candidate);
        }
        if n == 3 {
            trace!(target = %target.display(), "collision: several suffixes taken, still searching");
        }
    }
    Err(RenamerError::CollisionExhausted {
        target: target.to_path_buf(),
        attempts: max_attempts,
    })
}

/// `dir/stem_dup{n}.ext`
pub fn dup_candidate(target: &Path, n: u32) -> PathBuf {
    let stem = target
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| OsString::from("x"));
    let suffix = format!("{DUP_MARKER}{n}");
    let name = fit_name(&stem, target.extension(), &suffix);
    target.with_file_name(name)
}

fn name_len(s: &OsStr) -> usize {
    s.as_encoded_bytes().len()
}

/// `stem + suffix [+ "." + ext]`, shrinking the stem to fit MAX_FILENAME_LEN.
fn fit_name(stem: &OsStr, ext: Option<&OsStr>, suffix: &str) -> OsString {
    let overhead = suffix.len() + ext.map(|e| 1 + name_len(e)).unwrap_or(0);
    let budget = MAX_FILENAME_LEN.saturating_sub(overhead).max(1);

    let mut out = if name_len(stem) <= budget {
        stem.to_os_string()
    } else {
        let lossy = stem.to_string_lossy();
        let mut kept = String::new();
        for ch in lossy.chars() {
            if kept.len() + ch.len_utf8() > budget {
                break;
            }
            kept.push(ch);
        }
        if kept.is_empty() {
            kept.push('x');
        }
        OsString::from(kept)
    };
    out.push(suffix);
    if let Some(e) = ext {
        out.push(".");
        out.push(e);
    }
    out
}
