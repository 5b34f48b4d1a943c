//! Config and root validation.
//! Everything here runs before the engine touches the tree.

use anyhow::{Context, Result, bail};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::errors::{RenameResult, RenamerError};
use crate::utils::is_writable_probe;

use super::types::Config;

/// Upper bound accepted for `max_depth`.
pub const MAX_DEPTH_LIMIT: usize = 64;

impl Config {
    /// Check limits and extension syntax.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth > MAX_DEPTH_LIMIT {
            bail!("max_depth {} is above the limit of {MAX_DEPTH_LIMIT}", self.max_depth);
        }
        if self.max_collision_attempts == 0 {
            bail!("max_collision_attempts must be at least 1");
        }
        if self.allowed_extensions.is_empty() {
            bail!("allowed_extensions is empty; nothing would be renamed");
        }
        if let Some(bad) = self
            .allowed_extensions
            .iter()
            .find(|e| !e.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            bail!("invalid extension '{bad}': use letters and digits only, without dots");
        }
        debug!(
            max_depth = self.max_depth,
            extensions = %self.allowed_extensions,
            max_collision_attempts = self.max_collision_attempts,
            "config validated"
        );
        Ok(())
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> RenamerError {
    let reason = reason.into();
    error!(path = %path.display(), %reason, "invalid root");
    RenamerError::InvalidRoot {
        path: path.to_path_buf(),
        reason,
    }
}

/// Validate the root of a run and return its canonical form. The root must be an
/// existing, readable, non-symlink directory; it must also be writable unless
/// `dry_run` is set.
pub fn validate_root(root: &Path, dry_run: bool) -> RenameResult<PathBuf> {
    let meta = match fs::symlink_metadata(root) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(invalid(root, "does not exist"));
        }
        Err(e) => return Err(invalid(root, e.to_string())),
    };
    if meta.file_type().is_symlink() {
        return Err(invalid(root, "is a symlink; pass the real directory"));
    }
    if !meta.is_dir() {
        return Err(invalid(root, "is not a directory"));
    }
    fs::read_dir(root).map_err(|e| RenamerError::PermissionDenied {
        path: root.to_path_buf(),
        context: format!("cannot read directory: {e}"),
    })?;
    if !dry_run {
        is_writable_probe(root).map_err(|e| RenamerError::PermissionDenied {
            path: root.to_path_buf(),
            context: format!("cannot write directory: {e}"),
        })?;
    }
    let canonical = dunce::canonicalize(root).map_err(|e| invalid(root, e.to_string()))?;
    debug!(root = %canonical.display(), dry_run, "root validated");
    Ok(canonical)
}

/// Resolve the transaction-log directory for a run over `root` (already canonical).
/// Created when missing, must be writable, and must be `root` itself or outside it:
/// a log directory inside the tree would be renamed by the run.
pub fn validate_log_dir(log_dir: &Path, root: &Path) -> Result<PathBuf> {
    let inside = |p: &Path| p != root && p.starts_with(root);
    if inside(log_dir) {
        bail!(
            "log_dir '{}' must not be inside the root '{}'",
            log_dir.display(),
            root.display()
        );
    }
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log_dir '{}'", log_dir.display()))?;
        info!("Created log_dir directory: {}", log_dir.display());
    }
    if !log_dir.is_dir() {
        bail!("log_dir is not a directory: {}", log_dir.display());
    }
    let canonical = dunce::canonicalize(log_dir)
        .with_context(|| format!("resolve log_dir '{}'", log_dir.display()))?;
    if inside(&canonical) {
        bail!(
            "log_dir '{}' must not be inside the root '{}'",
            canonical.display(),
            root.display()
        );
    }
    is_writable_probe(&canonical).with_context(|| {
        format!("Cannot write to log_dir '{}'; check permissions", canonical.display())
    })?;
    Ok(canonical)
}
