//! I/O error enrichment.
//!
//! Adapters that prefix an io::Error with the operation and path and append a short
//! platform hint, for use with `map_err` in both io::Result and anyhow::Result code:
//!
//!   fs::rename(a, b).map_err(io_context("rename", a))?;          // io::Result
//!   fs::read_dir(root).map_err(io_error_with_help("scan", root))?; // anyhow::Result

use anyhow::anyhow;
use std::io;
use std::path::Path;

#[cfg(unix)]
fn hint_for_os_code(code: i32) -> Option<&'static str> {
    let hint = match code {
        libc::EACCES | libc::EPERM => "permission denied; check ownership and write permissions",
        libc::EXDEV => "cross-filesystem; rename cannot cross devices",
        libc::EBUSY => "resource busy; another process may hold the entry",
        libc::ENOENT => "path not found; it may have been moved by another process",
        libc::EEXIST | libc::ENOTEMPTY => "target already exists",
        libc::ENOSPC => "no space left on device",
        libc::EROFS => "read-only filesystem",
        libc::ENAMETOOLONG => "name too long; shorten the directory names",
        libc::EMFILE | libc::ENFILE => "too many open files",
        _ => return None,
    };
    Some(hint)
}

#[cfg(windows)]
fn hint_for_os_code(code: i32) -> Option<&'static str> {
    let hint = match code {
        5 => "access denied; check permissions",
        17 => "not same device; rename cannot cross volumes",
        32 => "sharing violation; the file is open in another program",
        2 | 3 => "path not found; it may have been moved by another process",
        80 | 183 => "target already exists",
        112 => "disk full",
        206 => "name too long (MAX_PATH exceeded)",
        _ => return None,
    };
    Some(hint)
}

#[cfg(not(any(unix, windows)))]
fn hint_for_os_code(_code: i32) -> Option<&'static str> {
    None
}

fn hint_for_kind(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::PermissionDenied => Some("permission denied"),
        io::ErrorKind::NotFound => Some("path not found"),
        io::ErrorKind::AlreadyExists => Some("target already exists"),
        _ => None,
    }
}

fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    let hint = match e.raw_os_error() {
        Some(code) => hint_for_os_code(code),
        None => hint_for_kind(e.kind()),
    };
    if let Some(h) = hint {
        msg.push_str(" (");
        msg.push_str(h);
        msg.push(')');
    }
    msg
}

/// Adapter for io::Result code: keeps the ErrorKind, enriches the message.
pub fn io_context<'a>(op: &'a str, path: &'a Path) -> impl FnOnce(io::Error) -> io::Error + 'a {
    move |e: io::Error| io::Error::new(e.kind(), build_message(op, path, &e))
}

/// Adapter for anyhow::Result code.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(build_message(op, path, &e))
}
