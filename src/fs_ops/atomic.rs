//! Durable rename.
//! - Never replaces an existing destination: callers resolve collisions first, and an
//!   occupied destination is reported as AlreadyExists (Unix `rename` would clobber files).
//! - On Unix, best-effort fsync of the affected parent directories after the rename.

use std::fs;
use std::io;
use std::path::Path;

use super::helpers::io_context;
use super::util::{fsync_dir, same_entry};

pub(crate) fn rename_durable(src: &Path, dst: &Path) -> io::Result<()> {
    // A case-only rename reports the destination as existing on case-insensitive volumes.
    if fs::symlink_metadata(dst).is_ok() && !same_entry(src, dst) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("rename '{}' -> '{}': destination exists", src.display(), dst.display()),
        ));
    }

    fs::rename(src, dst).map_err(io_context("rename", src))?;

    // The rename already happened; fsync failures must not turn it into an error.
    if let Some(parent) = dst.parent() {
        let _ = fsync_dir(parent);
    }
    if let (Some(sp), Some(dp)) = (src.parent(), dst.parent())
        && sp != dp
    {
        let _ = fsync_dir(sp);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn renames_file() {
        let td = tempdir().unwrap();
        let a = td.path().join("a.txt");
        let b = td.path().join("b.txt");
        fs::write(&a, b"x").unwrap();
        rename_durable(&a, &b).unwrap();
        assert!(!a.exists());
        assert_eq!(fs::read(&b).unwrap(), b"x");
    }

    #[test]
    fn refuses_to_clobber() {
        let td = tempdir().unwrap();
        let a = td.path().join("a.txt");
        let b = td.path().join("b.txt");
        fs::write(&a, b"new").unwrap();
        fs::write(&b, b"old").unwrap();
        let err = rename_durable(&a, &b).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&b).unwrap(), b"old");
        assert!(a.exists());
    }
}
