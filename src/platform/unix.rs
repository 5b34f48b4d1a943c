use anyhow::{Context, Result, bail};
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use super::sibling::partial_path;

const PRIVATE_FILE: u32 = 0o600;
const PRIVATE_DIR: u32 = 0o700;

/// Append handle for a log. A fresh file starts out 0600; an existing one keeps
/// whatever mode it has.
pub fn open_private_append(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new()
        .append(true)
        .create(true)
        .mode(PRIVATE_FILE)
        .open(path)
}

/// Create `path` with `contents`, never replacing an existing entry. The bytes go
/// to a 0600 scratch sibling first and are renamed into place once synced.
pub fn write_private_new(path: &Path, contents: &[u8]) -> Result<()> {
    if fs::symlink_metadata(path).is_ok() {
        bail!("refusing to overwrite existing file {}", path.display());
    }
    let Some(dir) = path.parent() else {
        bail!("{} has no parent directory", path.display());
    };
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let scratch = partial_path(path);
    let written = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(PRIVATE_FILE)
        .open(&scratch)
        .and_then(|mut f| {
            f.write_all(contents)?;
            f.sync_all()
        })
        .and_then(|()| fs::rename(&scratch, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&scratch);
        return Err(e).with_context(|| format!("write {}", path.display()));
    }

    // Persist the new directory entry.
    File::open(dir)
        .and_then(|d| d.sync_all())
        .with_context(|| format!("sync {}", dir.display()))
}

pub fn restrict_dir(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, Permissions::from_mode(PRIVATE_DIR))
}

pub fn restrict_file(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, Permissions::from_mode(PRIVATE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::sibling::PARTIAL_MARKER;
    use tempfile::tempdir;

    fn mode_of(p: &Path) -> u32 {
        fs::metadata(p).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn append_does_not_tighten_an_existing_log() {
        let td = tempdir().unwrap();
        let log = td.path().join("shared.log");
        fs::write(&log, b"kept\n").unwrap();
        fs::set_permissions(&log, Permissions::from_mode(0o640)).unwrap();
        drop(open_private_append(&log).unwrap());
        assert_eq!(mode_of(&log), 0o640);
    }

    #[test]
    fn append_creates_missing_parent_and_file() {
        let td = tempdir().unwrap();
        let log = td.path().join("logs").join("run.log");
        drop(open_private_append(&log).unwrap());
        assert_eq!(mode_of(&log), PRIVATE_FILE);
    }

    #[test]
    fn new_file_is_private_and_leaves_no_scratch() {
        let td = tempdir().unwrap();
        let cfg = td.path().join("config.xml");
        write_private_new(&cfg, b"<config/>").unwrap();
        assert_eq!(mode_of(&cfg), PRIVATE_FILE);

        assert!(write_private_new(&cfg, b"<replaced/>").is_err());
        assert_eq!(fs::read(&cfg).unwrap(), b"<config/>");
        let leftovers: Vec<_> = fs::read_dir(td.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(PARTIAL_MARKER))
            .collect();
        assert!(leftovers.is_empty());
    }
}
