//! Metadata carry-over for staged copies.
//! Timestamps (atime, mtime) and, on Unix, the permission bits, so a renamed scan keeps
//! its capture date. Failures are logged and ignored.

use filetime::{FileTime, set_file_times};
use std::fs;
use std::path::Path;
use tracing::{trace, warn};

pub(crate) fn carry_over_metadata(dest: &Path, src_meta: &fs::Metadata) {
    let at = FileTime::from_last_access_time(src_meta);
    let mt = FileTime::from_last_modification_time(src_meta);
    match set_file_times(dest, at, mt) {
        Ok(()) => trace!(path = %dest.display(), "copied atime/mtime"),
        Err(e) => warn!(path = %dest.display(), error = %e, "failed to copy atime/mtime"),
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = src_meta.permissions().mode() & 0o777;
        if let Err(e) = fs::set_permissions(dest, fs::Permissions::from_mode(mode)) {
            warn!(path = %dest.display(), mode = format!("{:o}", mode), error = %e, "failed to copy permissions");
        }
    }
    #[cfg(windows)]
    {
        if let Ok(meta) = fs::metadata(dest) {
            let mut perms = meta.permissions();
            perms.set_readonly(src_meta.permissions().readonly());
            let _ = fs::set_permissions(dest, perms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mtime_is_carried_over() {
        let td = tempdir().unwrap();
        let src = td.path().join("src.jpg");
        let dst = td.path().join("dst.jpg");
        fs::write(&src, b"a").unwrap();
        fs::write(&dst, b"a").unwrap();
        let old = FileTime::from_unix_time(1_000_000_000, 0);
        set_file_times(&src, old, old).unwrap();

        carry_over_metadata(&dst, &fs::metadata(&src).unwrap());

        let got = FileTime::from_last_modification_time(&fs::metadata(&dst).unwrap());
        assert_eq!(got, old);
    }
}
