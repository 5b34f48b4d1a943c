//! Transaction log: the line format, the append-only writer, summaries and undo.

mod entry;
mod log;
mod summary;
mod undo;

pub use entry::{ActionKind, DRY_MARKER, ErrorKind, LogEntry, START_NOTE, TIMESTAMP_FORMAT};
pub use log::{LOG_FILE_PREFIX, TransactionLog};
pub use summary::{LogSummary, RenamePair, find_latest_log};
pub use undo::{
    BACKUP_MARKER, UndoKind, UndoOptions, UndoPlan, UndoReport, UndoStep, apply_undo,
    undo_log_path,
};
