//! One transaction-log line.
//!
//! Format: `<timestamp> [DRY: ]<KIND>: <source>[ -> <destination>][  # <detail>]`
//! with the timestamp in local time (`%Y-%m-%dT%H:%M:%S%.6f`).
//!
//! Path fields are escaped (`\\`, `\>`, `\#`, `\n`, `\r`), so neither separator can
//! occur inside one. Only `ERROR_*` lines carry a detail; `NOTE` text is written as is.

use chrono::NaiveDateTime;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
pub const DRY_MARKER: &str = "DRY: ";
const ARROW: &str = " -> ";
const DETAIL_SEP: &str = "  # ";
/// Leading word of the note that opens a run; the root follows ` root=` at the end.
pub const START_NOTE: &str = "START";
const ROOT_FIELD: &str = " root=";

/// Failure sub-kinds, written as `ERROR_<SUBKIND>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Depth,
    DirRename,
    Rollback,
    Copy,
    Collision,
    Commit,
    Delete,
    Cleanup,
    Interrupted,
    Undo,
}

impl ErrorKind {
    const ALL: [ErrorKind; 10] = [
        ErrorKind::Depth,
        ErrorKind::DirRename,
        ErrorKind::Rollback,
        ErrorKind::Copy,
        ErrorKind::Collision,
        ErrorKind::Commit,
        ErrorKind::Delete,
        ErrorKind::Cleanup,
        ErrorKind::Interrupted,
        ErrorKind::Undo,
    ];

    fn suffix(self) -> &'static str {
        match self {
            ErrorKind::Depth => "DEPTH",
            ErrorKind::DirRename => "DIR_RENAME",
            ErrorKind::Rollback => "ROLLBACK",
            ErrorKind::Copy => "COPY",
            ErrorKind::Collision => "COLLISION",
            ErrorKind::Commit => "COMMIT",
            ErrorKind::Delete => "DELETE",
            ErrorKind::Cleanup => "CLEANUP",
            ErrorKind::Interrupted => "INTERRUPTED",
            ErrorKind::Undo => "UNDO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    RenamedDir,
    RenamedFile,
    Copied,
    SetAside,
    RemovedOld,
    Skipped,
    RollbackDir,
    RollbackCopy,
    RollbackFile,
    UndoFile,
    UndoDir,
    Error(ErrorKind),
    Note,
}

impl ActionKind {
    pub fn is_error(self) -> bool {
        matches!(self, ActionKind::Error(_))
    }

    fn fixed_token(self) -> Option<&'static str> {
        let t = match self {
            ActionKind::RenamedDir => "RENAMED_DIR",
            ActionKind::RenamedFile => "RENAMED_FILE",
            ActionKind::Copied => "COPIED",
            ActionKind::SetAside => "SET_ASIDE",
            ActionKind::RemovedOld => "REMOVED_OLD",
            ActionKind::Skipped => "SKIPPED",
            ActionKind::RollbackDir => "ROLLBACK_DIR",
            ActionKind::RollbackCopy => "ROLLBACK_COPY",
            ActionKind::RollbackFile => "ROLLBACK_FILE",
            ActionKind::UndoFile => "UNDO_FILE",
            ActionKind::UndoDir => "UNDO_DIR",
            ActionKind::Note => "NOTE",
            ActionKind::Error(_) => return None,
        };
        Some(t)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Error(sub) => write!(f, "ERROR_{}", sub.suffix()),
            other => f.write_str(other.fixed_token().unwrap_or_default()),
        }
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(sub) = s.strip_prefix("ERROR_") {
            return ErrorKind::ALL
                .iter()
                .find(|k| k.suffix() == sub)
                .map(|k| ActionKind::Error(*k))
                .ok_or_else(|| format!("unknown error kind '{s}'"));
        }
        let all = [
            ActionKind::RenamedDir,
            ActionKind::RenamedFile,
            ActionKind::Copied,
            ActionKind::SetAside,
            ActionKind::RemovedOld,
            ActionKind::Skipped,
            ActionKind::RollbackDir,
            ActionKind::RollbackCopy,
            ActionKind::RollbackFile,
            ActionKind::UndoFile,
            ActionKind::UndoDir,
            ActionKind::Note,
        ];
        all.into_iter()
            .find(|k| k.fixed_token() == Some(s))
            .ok_or_else(|| format!("unknown action kind '{s}'"))
    }
}

/// Parsed (or about to be written) log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub dry_run: bool,
    pub kind: ActionKind,
    /// Source path, or free text for `NOTE`.
    pub source: String,
    pub destination: Option<String>,
    pub detail: Option<String>,
}

impl LogEntry {
    pub fn source_path(&self) -> &Path {
        Path::new(&self.source)
    }

    pub fn destination_path(&self) -> Option<&Path> {
        self.destination.as_deref().map(Path::new)
    }

    /// Text of the note that opens a run; the root goes last so it may contain spaces.
    pub fn start_note_text(root: &Path, max_depth: usize) -> String {
        format!("{START_NOTE} max_depth={max_depth}{ROOT_FIELD}{}", root.display())
    }

    /// Root of the run, when this is the opening note.
    pub fn start_root(&self) -> Option<PathBuf> {
        if self.kind != ActionKind::Note || !self.source.starts_with(START_NOTE) {
            return None;
        }
        self.source
            .split_once(ROOT_FIELD)
            .map(|(_, root)| PathBuf::from(root))
    }

    /// Parse one line. Blank lines are `Ok(None)`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }
        let (ts, rest) = line
            .split_once(' ')
            .ok_or_else(|| "missing timestamp".to_string())?;
        let timestamp = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
            .map_err(|e| format!("bad timestamp '{ts}': {e}"))?;

        let (dry_run, rest) = match rest.strip_prefix(DRY_MARKER) {
            Some(r) => (true, r),
            None => (false, rest),
        };
        let (token, body) = rest
            .split_once(": ")
            .ok_or_else(|| "missing action kind".to_string())?;
        let kind: ActionKind = token.parse()?;

        let (source, destination, detail) = if kind == ActionKind::Note {
            (body.to_string(), None, None)
        } else {
            let (paths, detail) = match split_unescaped(body, DETAIL_SEP) {
                Some((p, d)) if kind.is_error() => (p, Some(d.to_string())),
                _ => (body, None),
            };
            match split_unescaped(paths, ARROW) {
                Some((s, d)) => (unescape_field(s)?, Some(unescape_field(d)?), detail),
                None => (unescape_field(paths)?, None, detail),
            }
        };

        Ok(Some(LogEntry {
            timestamp,
            dry_run,
            kind,
            source,
            destination,
            detail,
        }))
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.timestamp.format(TIMESTAMP_FORMAT))?;
        if self.dry_run {
            f.write_str(DRY_MARKER)?;
        }
        if self.kind == ActionKind::Note {
            return write!(f, "{}: {}", self.kind, self.source);
        }
        write!(f, "{}: {}", self.kind, escape_field(&self.source))?;
        if let Some(d) = &self.destination {
            write!(f, "{ARROW}{}", escape_field(d))?;
        }
        if let Some(d) = self.detail.as_ref().filter(|_| self.kind.is_error()) {
            write!(f, "{DETAIL_SEP}{d}")?;
        }
        Ok(())
    }
}

fn escape_field(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '>' => out.push_str("\\>"),
            '#' => out.push_str("\\#"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_field(field: &str) -> Result<String, String> {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('>') => out.push('>'),
            Some('#') => out.push('#'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(format!("bad escape '\\{other}' in '{field}'")),
            None => return Err(format!("dangling '\\' in '{field}'")),
        }
    }
    Ok(out)
}

/// Split at the first `sep` that is not part of an escape sequence.
fn split_unescaped<'a>(s: &'a str, sep: &str) -> Option<(&'a str, &'a str)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        // `sep` is ASCII, so a match always starts on a char boundary.
        if bytes[i..].starts_with(sep.as_bytes()) {
            return Some((&s[..i], &s[i + sep.len()..]));
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_tokens() {
        for token in ["RENAMED_DIR", "SET_ASIDE", "ERROR_DIR_RENAME", "ERROR_COMMIT", "NOTE"] {
            let kind: ActionKind = token.parse().unwrap();
            assert_eq!(kind.to_string(), token);
        }
        assert!("RENAMED".parse::<ActionKind>().is_err());
        assert!("ERROR_NOPE".parse::<ActionKind>().is_err());
    }

    #[test]
    fn parses_dry_rename_with_detail() {
        let line = "2024-05-01T10:11:12.000123 DRY: ERROR_COPY: /r/a b/x.jpg -> /r/.s/x.jpg  # disk full";
        let e = LogEntry::parse_line(line).unwrap().unwrap();
        assert!(e.dry_run);
        assert_eq!(e.kind, ActionKind::Error(ErrorKind::Copy));
        assert_eq!(e.source, "/r/a b/x.jpg");
        assert_eq!(e.destination.as_deref(), Some("/r/.s/x.jpg"));
        assert_eq!(e.detail.as_deref(), Some("disk full"));
        assert_eq!(e.to_string(), line);
    }

    #[test]
    fn note_keeps_arrows_in_text() {
        let line = "2024-05-01T10:11:12.000000 NOTE: START root=/r -> ok";
        let e = LogEntry::parse_line(line).unwrap().unwrap();
        assert_eq!(e.kind, ActionKind::Note);
        assert_eq!(e.source, "START root=/r -> ok");
        assert!(e.destination.is_none());
    }

    #[test]
    fn start_note_carries_root() {
        let text = LogEntry::start_note_text(Path::new("/data/Archiv 2"), 4);
        let line = format!("2024-05-01T10:11:12.000000 NOTE: {text}");
        let e = LogEntry::parse_line(&line).unwrap().unwrap();
        assert_eq!(e.start_root(), Some(PathBuf::from("/data/Archiv 2")));
    }

    #[test]
    fn separators_inside_paths_survive() {
        let line = r"2024-05-01T10:11:12.000000 RENAMED_DIR: /r/A -\> B\\ \#1 -> /r/a_-_b_1";
        let e = LogEntry::parse_line(line).unwrap().unwrap();
        assert_eq!(e.source, r"/r/A -> B\ #1");
        assert_eq!(e.destination.as_deref(), Some("/r/a_-_b_1"));
        assert!(e.detail.is_none());
        assert_eq!(e.to_string(), line);
    }

    #[test]
    fn unknown_escape_is_rejected() {
        assert!(LogEntry::parse_line(r"2024-05-01T10:11:12.000000 RENAMED_DIR: /r/\q -> /r/q").is_err());
    }

    #[test]
    fn split_skips_escaped_bytes() {
        assert_eq!(split_unescaped(r"a\  # b  # c", DETAIL_SEP), Some((r"a\  # b", "c")));
        assert_eq!(split_unescaped(r"a \-> b", ARROW), None);
    }

    #[test]
    fn blank_and_garbage_lines() {
        assert_eq!(LogEntry::parse_line("   \n").unwrap(), None);
        assert!(LogEntry::parse_line("not a log line").is_err());
        assert!(LogEntry::parse_line("2024-05-01T10:11:12.000000 WHAT: x").is_err());
    }
}
