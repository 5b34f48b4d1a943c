//! In-memory snapshot of a tree for dry runs.
//!
//! The snapshot is taken read-only from the real root; afterwards every operation
//! mutates only the map, so the engine can run unchanged and still see the effects of
//! its own earlier (simulated) renames.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use super::backend::{EntryKind, Filesystem, PathEntry, RealFs, WalkFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedFs {
    root: PathBuf,
    entries: BTreeMap<PathBuf, EntryKind>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("simulated: '{}' does not exist", path.display()),
    )
}

fn already_exists(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("simulated: '{}' already exists", path.display()),
    )
}

impl SimulatedFs {
    /// Empty tree containing only `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut entries = BTreeMap::new();
        entries.insert(root.clone(), EntryKind::Dir);
        Self { root, entries }
    }

    /// Snapshot the real tree under `root` (no filter: pruning happens at walk time).
    pub fn snapshot(root: &Path) -> io::Result<Self> {
        let mut sim = Self::new(root);
        for entry in RealFs.entries_under(root, &WalkFilter::new())? {
            sim.entries.insert(entry.path, entry.kind);
        }
        Ok(sim)
    }

    /// Add an entry (and its missing parent directories). Used to seed tests.
    pub fn insert(&mut self, path: impl Into<PathBuf>, kind: EntryKind) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.add_dirs(parent);
        }
        self.entries.insert(path, kind);
    }

    pub fn kind_of(&self, path: &Path) -> Option<EntryKind> {
        self.entries.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    fn add_dirs(&mut self, dir: &Path) {
        for anc in dir.ancestors() {
            if !anc.starts_with(&self.root) || self.entries.contains_key(anc) {
                break;
            }
            self.entries.insert(anc.to_path_buf(), EntryKind::Dir);
        }
    }

    fn keys_under(&self, path: &Path) -> Vec<PathBuf> {
        self.entries
            .range(path.to_path_buf()..)
            .take_while(|(k, _)| k.starts_with(path))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn has_children(&self, path: &Path) -> bool {
        self.entries
            .range(path.to_path_buf()..)
            .skip(1)
            .take_while(|(k, _)| k.starts_with(path))
            .next()
            .is_some()
    }

    fn require_parent_dir(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if self.entries.get(parent) == Some(&EntryKind::Dir) => Ok(()),
            Some(parent) => Err(not_found(parent)),
            None => Err(not_found(path)),
        }
    }
}

impl Filesystem for SimulatedFs {
    fn is_simulated(&self) -> bool {
        true
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    fn same_entry(&self, a: &Path, b: &Path) -> bool {
        a == b && self.entries.contains_key(a)
    }

    fn entries_under(&self, root: &Path, filter: &WalkFilter) -> io::Result<Vec<PathEntry>> {
        if !self.entries.contains_key(root) {
            return Err(not_found(root));
        }
        let entries = self
            .entries
            .range(root.to_path_buf()..)
            .skip(1)
            .take_while(|(k, _)| k.starts_with(root))
            .filter(|(k, _)| !filter.excludes_under(root, k))
            .filter_map(|(k, kind)| {
                let depth = k.strip_prefix(root).ok()?.components().count();
                Some(PathEntry { path: k.clone(), kind: *kind, depth })
            })
            .collect();
        Ok(entries)
    }

    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        if !self.entries.contains_key(from) {
            return Err(not_found(from));
        }
        if self.entries.contains_key(to) {
            return Err(already_exists(to));
        }
        self.require_parent_dir(to)?;
        for old in self.keys_under(from) {
            if let Some(kind) = self.entries.remove(&old) {
                let rest = old.strip_prefix(from).unwrap_or(Path::new(""));
                let new = if rest.as_os_str().is_empty() { to.to_path_buf() } else { to.join(rest) };
                self.entries.insert(new, kind);
            }
        }
        Ok(())
    }

    fn copy_file(&mut self, from: &Path, to: &Path) -> io::Result<u64> {
        match self.entries.get(from) {
            Some(EntryKind::File) => {}
            _ => return Err(not_found(from)),
        }
        if self.entries.contains_key(to) {
            return Err(already_exists(to));
        }
        self.require_parent_dir(to)?;
        self.entries.insert(to.to_path_buf(), EntryKind::File);
        Ok(0)
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        match self.entries.get(path) {
            Some(EntryKind::File) => {
                self.entries.remove(path);
                Ok(())
            }
            _ => Err(not_found(path)),
        }
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        if self.entries.get(path) == Some(&EntryKind::File) {
            return Err(already_exists(path));
        }
        self.add_dirs(path);
        Ok(())
    }

    fn remove_dir(&mut self, path: &Path) -> io::Result<()> {
        if self.entries.get(path) != Some(&EntryKind::Dir) {
            return Err(not_found(path));
        }
        if self.has_children(path) {
            return Err(io::Error::new(
                io::ErrorKind::DirectoryNotEmpty,
                format!("simulated: '{}' is not empty", path.display()),
            ));
        }
        self.entries.remove(path);
        Ok(())
    }

    fn remove_dir_all(&mut self, path: &Path) -> io::Result<()> {
        if !self.entries.contains_key(path) {
            return Err(not_found(path));
        }
        for key in self.keys_under(path) {
            self.entries.remove(&key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SimulatedFs {
        let mut sim = SimulatedFs::new("/r");
        sim.insert("/r/A/B/scan1.jpg", EntryKind::File);
        sim.insert("/r/A/notes.txt", EntryKind::File);
        sim
    }

    #[test]
    fn rename_moves_subtree() {
        let mut sim = seeded();
        sim.rename(Path::new("/r/A"), Path::new("/r/a")).unwrap();
        assert!(!sim.exists(Path::new("/r/A")));
        assert!(!sim.exists(Path::new("/r/A/B/scan1.jpg")));
        assert_eq!(sim.kind_of(Path::new("/r/a/B/scan1.jpg")), Some(EntryKind::File));
        assert_eq!(sim.kind_of(Path::new("/r/a/B")), Some(EntryKind::Dir));
    }

    #[test]
    fn rename_does_not_touch_siblings_sharing_a_prefix() {
        let mut sim = seeded();
        sim.insert("/r/AB", EntryKind::Dir);
        sim.rename(Path::new("/r/A"), Path::new("/r/x")).unwrap();
        assert!(sim.exists(Path::new("/r/AB")));
    }

    #[test]
    fn rename_refuses_existing_target() {
        let mut sim = seeded();
        sim.insert("/r/a", EntryKind::Dir);
        let err = sim.rename(Path::new("/r/A"), Path::new("/r/a")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn copy_and_remove() {
        let mut sim = seeded();
        sim.create_dir_all(Path::new("/r/.stage/files")).unwrap();
        sim.copy_file(Path::new("/r/A/notes.txt"), Path::new("/r/.stage/files/n.txt")).unwrap();
        assert!(sim.exists(Path::new("/r/.stage/files/n.txt")));
        assert!(sim.remove_dir(Path::new("/r/.stage/files")).is_err());
        sim.remove_dir_all(Path::new("/r/.stage")).unwrap();
        assert!(!sim.exists(Path::new("/r/.stage/files/n.txt")));
    }

    #[test]
    fn walk_matches_path_order_and_filter() {
        let mut sim = seeded();
        sim.insert("/r/.stage_1/files/x.jpg", EntryKind::File);
        let filter = WalkFilter::new().skip_name_prefix(".stage_");
        let paths: Vec<PathBuf> = sim
            .entries_under(Path::new("/r"), &filter)
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/r/A"),
                PathBuf::from("/r/A/B"),
                PathBuf::from("/r/A/B/scan1.jpg"),
                PathBuf::from("/r/A/notes.txt"),
            ]
        );
    }
}
