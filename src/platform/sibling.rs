use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

pub(crate) const PARTIAL_MARKER: &str = ".partial-";

static NEXT: AtomicU32 = AtomicU32::new(0);

/// Hidden scratch name next to `target`, e.g. `.config.xml.partial-4711-0`.
/// Unique per process and call, so two writers never share one.
pub(crate) fn partial_path(target: &Path) -> PathBuf {
    let base = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let name = format!(".{base}{PARTIAL_MARKER}{}-{n}", std::process::id());
    match target.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_name_sits_beside_target() {
        let a = partial_path(Path::new("/srv/cfg/config.xml"));
        let b = partial_path(Path::new("/srv/cfg/config.xml"));
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(Path::new("/srv/cfg")));
        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".config.xml.partial-"), "{name}");
    }
}
