//! Ancestor-derived naming for files in a leaf directory.

use std::path::{Component, Path};

use super::sanitize::{FALLBACK_NAME, sanitize};

/// Sanitized grandparent/parent/self chain of a leaf directory, relative to the run root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingContext {
    pub grandparent: String,
    pub parent: String,
    pub leaf: String,
}

impl NamingContext {
    /// Build from a directory path relative to the root. Missing levels become `x`;
    /// the root itself (empty relative path) yields `x/x/x`.
    pub fn from_relative(rel_dir: &Path) -> Self {
        let names: Vec<String> = rel_dir
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(sanitize(&s.to_string_lossy())),
                _ => None,
            })
            .collect();
        let level = |back: usize| -> String {
            names
                .len()
                .checked_sub(back)
                .and_then(|i| names.get(i).cloned())
                .unwrap_or_else(|| FALLBACK_NAME.to_string())
        };
        Self {
            grandparent: level(3),
            parent: level(2),
            leaf: level(1),
        }
    }

    /// `{grandparent}_{parent}_nr_{leaf}_{seq:04}.{ext}` with the extension lowercased.
    pub fn file_name(&self, seq: usize, extension: &str) -> String {
        let mut name = format!(
            "{}_{}_nr_{}_{:04}",
            self.grandparent, self.parent, self.leaf, seq
        );
        let ext = extension.trim_start_matches('.');
        if !ext.is_empty() {
            name.push('.');
            name.push_str(&ext.to_lowercase());
        }
        name
    }
}
