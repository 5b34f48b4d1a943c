//! Log summary: counts and samples of what a run did.

use serde::Serialize;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::entry::{ActionKind, LogEntry, TIMESTAMP_FORMAT};
use super::log::LOG_FILE_PREFIX;
use crate::fs_ops::io_context;
use crate::naming::natural_cmp;

const SAMPLE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePair {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LogSummary {
    pub log_file: Option<PathBuf>,
    pub dry_run: bool,
    pub first_entry: Option<String>,
    pub last_entry: Option<String>,
    pub dirs_renamed: usize,
    pub files_renamed: usize,
    pub copied: usize,
    pub removed_old: usize,
    pub skipped: usize,
    pub rollbacks: usize,
    pub errors: usize,
    pub unparsed_lines: usize,
    pub error_samples: Vec<String>,
    pub dir_rename_samples: Vec<RenamePair>,
    pub file_rename_samples: Vec<RenamePair>,
}

fn pair(e: &LogEntry) -> RenamePair {
    RenamePair {
        from: e.source.clone(),
        to: e.destination.clone().unwrap_or_default(),
    }
}

fn push_sample<T>(samples: &mut Vec<T>, item: T) {
    if samples.len() < SAMPLE_LIMIT {
        samples.push(item);
    }
}

impl LogSummary {
    pub fn from_entries(entries: &[LogEntry]) -> Self {
        let mut s = LogSummary {
            first_entry: entries.first().map(|e| e.timestamp.format(TIMESTAMP_FORMAT).to_string()),
            last_entry: entries.last().map(|e| e.timestamp.format(TIMESTAMP_FORMAT).to_string()),
            ..Default::default()
        };
        for e in entries {
            s.dry_run |= e.dry_run;
            match e.kind {
                ActionKind::RenamedDir => {
                    s.dirs_renamed += 1;
                    push_sample(&mut s.dir_rename_samples, pair(e));
                }
                ActionKind::RenamedFile => {
                    s.files_renamed += 1;
                    push_sample(&mut s.file_rename_samples, pair(e));
                }
                ActionKind::Copied => s.copied += 1,
                ActionKind::RemovedOld => s.removed_old += 1,
                ActionKind::Skipped => s.skipped += 1,
                ActionKind::RollbackDir | ActionKind::RollbackCopy | ActionKind::RollbackFile => {
                    s.rollbacks += 1
                }
                ActionKind::Error(_) => {
                    s.errors += 1;
                    let mut msg = format!("{}: {}", e.kind, e.source);
                    if let Some(d) = &e.detail {
                        let _ = write!(msg, " ({d})");
                    }
                    push_sample(&mut s.error_samples, msg);
                }
                ActionKind::SetAside | ActionKind::UndoFile | ActionKind::UndoDir | ActionKind::Note => {}
            }
        }
        s
    }

    /// Summarize a log stream; lines that do not parse are counted, not fatal.
    pub fn from_reader(reader: impl BufRead) -> io::Result<Self> {
        let mut entries = Vec::new();
        let mut unparsed = 0usize;
        for line in reader.lines() {
            match LogEntry::parse_line(&line?) {
                Ok(Some(e)) => entries.push(e),
                Ok(None) => {}
                Err(_) => unparsed += 1,
            }
        }
        let mut s = Self::from_entries(&entries);
        s.unparsed_lines = unparsed;
        Ok(s)
    }

    pub fn from_path(path: &Path) -> io::Result<Self> {
        let file = File::open(path).map_err(io_context("open log", path))?;
        let mut s = Self::from_reader(BufReader::new(file))?;
        s.log_file = Some(path.to_path_buf());
        Ok(s)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Archive Rename Log Summary ===");
        if let Some(p) = &self.log_file {
            let _ = writeln!(out, "Log: {}", p.display());
        }
        let _ = writeln!(out, "Dry-run: {}", self.dry_run);
        let _ = writeln!(out, "Renamed directories: {}", self.dirs_renamed);
        let _ = writeln!(out, "Renamed files: {}", self.files_renamed);
        let _ = writeln!(out, "Copied to staging: {}", self.copied);
        let _ = writeln!(out, "Removed originals: {}", self.removed_old);
        let _ = writeln!(out, "Skipped (already named): {}", self.skipped);
        let _ = writeln!(out, "Rollbacks: {}", self.rollbacks);
        let _ = writeln!(out, "Errors: {}", self.errors);
        if self.unparsed_lines > 0 {
            let _ = writeln!(out, "Unparsed lines: {}", self.unparsed_lines);
        }
        if !self.error_samples.is_empty() {
            let _ = writeln!(out, "\nErrors (sample):");
            for e in &self.error_samples {
                let _ = writeln!(out, " - {e}");
            }
        }
        for (title, samples) in [
            ("Examples of dir renames", &self.dir_rename_samples),
            ("Examples of file renames", &self.file_rename_samples),
        ] {
            if samples.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n{title}:");
            for p in samples {
                let _ = writeln!(out, " - {} -> {}", p.from, p.to);
            }
        }
        out
    }
}

/// Newest `archive_rename_log_*.log` in `dir`, by name (names embed the start time).
pub fn find_latest_log(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut logs: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_context("read dir", dir))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(".log"))
        })
        .collect();
    logs.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(logs.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LOG: &str = "\
2024-05-01T10:00:00.000000 NOTE: START root=/r
2024-05-01T10:00:01.000000 RENAMED_DIR: /r/Box 1 -> /r/box_1
2024-05-01T10:00:02.000000 COPIED: /r/box_1/a.jpg -> /r/.s/files/box_1/x_x_nr_box_1_0001.jpg
2024-05-01T10:00:03.000000 SET_ASIDE: /r/box_1/a.jpg -> /r/.s/originals/box_1/a.jpg
2024-05-01T10:00:04.000000 RENAMED_FILE: /r/box_1/a.jpg -> /r/box_1/x_x_nr_box_1_0001.jpg
2024-05-01T10:00:05.000000 REMOVED_OLD: /r/box_1/a.jpg -> /r/box_1/x_x_nr_box_1_0001.jpg
2024-05-01T10:00:06.000000 ERROR_COPY: /r/box_2/b.jpg  # permission denied
garbage line
2024-05-01T10:00:07.000000 NOTE: FINISHED
";

    #[test]
    fn counts_match_log() {
        let s = LogSummary::from_reader(LOG.as_bytes()).unwrap();
        assert!(!s.dry_run);
        assert_eq!(s.dirs_renamed, 1);
        assert_eq!(s.files_renamed, 1);
        assert_eq!(s.copied, 1);
        assert_eq!(s.removed_old, 1);
        assert_eq!(s.errors, 1);
        assert_eq!(s.unparsed_lines, 1);
        assert_eq!(s.error_samples, vec!["ERROR_COPY: /r/box_2/b.jpg (permission denied)".to_string()]);
        assert_eq!(s.first_entry.as_deref(), Some("2024-05-01T10:00:00.000000"));
        let text = s.render();
        assert!(text.contains("Renamed files: 1"), "{text}");
        assert!(text.contains("/r/Box 1 -> /r/box_1"), "{text}");
    }

    #[test]
    fn json_has_counts() {
        let s = LogSummary::from_reader(LOG.as_bytes()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&s.to_json().unwrap()).unwrap();
        assert_eq!(v["dirs_renamed"], 1);
        assert_eq!(v["dry_run"], false);
    }

    #[test]
    fn latest_log_by_name() {
        let td = tempdir().unwrap();
        for name in [
            "archive_rename_log_20240101_090000.log",
            "archive_rename_log_20240102_090000.log",
            "archive_rename_log_20240102_090000_2.log",
            "undo_archive_rename_log_20240103_090000.log",
            "notes.txt",
        ] {
            fs::write(td.path().join(name), b"").unwrap();
        }
        let latest = find_latest_log(td.path()).unwrap().unwrap();
        assert_eq!(
            latest.file_name().unwrap(),
            "archive_rename_log_20240102_090000_2.log"
        );
    }
}
