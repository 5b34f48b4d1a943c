//! Config file location and symlink checks.
//!
//! Resolution order: `--config`, then `$ARCHIVE_RENAME_CONFIG`, then the OS config
//! dir (`<config_dir>/archive_rename/config.xml`). A path naming a directory means
//! `<dir>/config.xml`; a relative env path is resolved against the current dir.

use anyhow::{Context, Result, anyhow};
use dirs::config_dir;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "ARCHIVE_RENAME_CONFIG";
pub const CONFIG_FILE_NAME: &str = "config.xml";
const APP_DIR: &str = "archive_rename";

/// Where the config path came from. Only a missing default file is tolerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Flag(PathBuf),
    Env(PathBuf),
    Default(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Flag(p) | ConfigSource::Env(p) | ConfigSource::Default(p) => p,
        }
    }

    pub fn is_explicit(&self) -> bool {
        !matches!(self, ConfigSource::Default(_))
    }
}

/// OS-appropriate default config path.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(mut base) = config_dir() {
        base.push(APP_DIR);
        base.push(CONFIG_FILE_NAME);
        Some(base)
    } else {
        env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join(".config")
                .join(APP_DIR)
                .join(CONFIG_FILE_NAME)
        })
    }
}

fn file_in_dir(p: PathBuf) -> PathBuf {
    if p.is_dir() { p.join(CONFIG_FILE_NAME) } else { p }
}

/// Pick the config path for this invocation.
pub fn resolve_config_path(flag: Option<&Path>) -> Result<ConfigSource> {
    if let Some(p) = flag {
        return Ok(ConfigSource::Flag(file_in_dir(p.to_path_buf())));
    }
    if let Some(raw) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        let p = PathBuf::from(raw);
        let p = if p.is_relative() {
            env::current_dir()
                .context("resolve current dir for relative config path")?
                .join(p)
        } else {
            p
        };
        return Ok(ConfigSource::Env(file_in_dir(p)));
    }
    default_config_path()
        .map(ConfigSource::Default)
        .ok_or_else(|| anyhow!("could not determine a default config path (no config dir or HOME)"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if let Ok(meta) = fs::symlink_metadata(anc)
            && meta.file_type().is_symlink()
        {
            return Ok(true);
        }
        p = anc.parent();
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn flag_directory_means_config_xml() {
        let td = tempdir().unwrap();
        let src = resolve_config_path(Some(td.path())).unwrap();
        assert_eq!(src, ConfigSource::Flag(td.path().join(CONFIG_FILE_NAME)));
        assert!(src.is_explicit());
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        if let Some(p) = default_config_path() {
            assert!(p.ends_with(Path::new(APP_DIR).join(CONFIG_FILE_NAME)));
        }
    }

    #[cfg(unix)]
    #[test]
    fn detects_symlinked_ancestor() {
        let td = tempdir().unwrap();
        let base = dunce::canonicalize(td.path()).unwrap();
        let real = base.join("real");
        fs::create_dir(&real).unwrap();
        let link = base.join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        assert!(path_has_symlink_ancestor(&link.join("log.txt")).unwrap());
        assert!(!path_has_symlink_ancestor(&real.join("log.txt")).unwrap());
    }
}
