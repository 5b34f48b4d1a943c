use anyhow::{Context, Result, bail};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use super::sibling::partial_path;

pub fn open_private_append(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().append(true).create(true).open(path)
}

/// Create `path` with `contents` via a scratch sibling. Never replaces an entry.
pub fn write_private_new(path: &Path, contents: &[u8]) -> Result<()> {
    if fs::symlink_metadata(path).is_ok() {
        bail!("refusing to overwrite existing file {}", path.display());
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let scratch = partial_path(path);
    let written = OpenOptions::new()
        .write(true)
        .create_new(true)
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
    Ok(())
}

// Access on Windows follows the parent's ACL.
pub fn restrict_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

pub fn restrict_file(_path: &Path) -> io::Result<()> {
    Ok(())
}
