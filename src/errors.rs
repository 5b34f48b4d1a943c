//! Typed error definitions for archive_rename.
//! Each variant maps to a stable numeric code so logs and exit paths can match on it.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenamerError {
    #[error("Invalid root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("Relative depth {observed} exceeds the allowed {limit} (deepest file: {deepest})")]
    DepthExceeded {
        observed: usize,
        limit: usize,
        deepest: PathBuf,
    },

    #[error("Failed to rename directory {from} -> {to}: {source}")]
    DirectoryRename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No free name for {target} after {attempts} attempts")]
    CollisionExhausted { target: PathBuf, attempts: u32 },

    #[error("Failed to stage {path}: {source}")]
    StageCopy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to commit {path}: {source}")]
    Commit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied on {path}: {context}")]
    PermissionDenied { path: PathBuf, context: String },

    #[error("Malformed log line {line}: {reason}")]
    LogParse { line: usize, reason: String },

    #[error("Operation interrupted by user")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RenamerError {
    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            RenamerError::InvalidRoot { .. } => 10,
            RenamerError::DepthExceeded { .. } => 11,
            RenamerError::DirectoryRename { .. } => 20,
            RenamerError::CollisionExhausted { .. } => 21,
            RenamerError::StageCopy { .. } => 30,
            RenamerError::Commit { .. } => 31,
            RenamerError::PermissionDenied { .. } => 40,
            RenamerError::LogParse { .. } => 50,
            RenamerError::Interrupted => 130,
            RenamerError::Io(_) => 1,
        }
    }

    /// Short machine-friendly kind label (`kind` field in structured logs).
    pub fn kind(&self) -> &'static str {
        match self {
            RenamerError::InvalidRoot { .. } => "invalid_root",
            RenamerError::DepthExceeded { .. } => "depth_exceeded",
            RenamerError::DirectoryRename { .. } => "directory_rename",
            RenamerError::CollisionExhausted { .. } => "collision_exhausted",
            RenamerError::StageCopy { .. } => "stage_copy",
            RenamerError::Commit { .. } => "commit",
            RenamerError::PermissionDenied { .. } => "permission_denied",
            RenamerError::LogParse { .. } => "log_parse",
            RenamerError::Interrupted => "interrupted",
            RenamerError::Io(_) => "io",
        }
    }
}

/// Library result alias.
pub type RenameResult<T> = std::result::Result<T, RenamerError>;
