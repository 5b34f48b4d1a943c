//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Writes a commented template on request (`init-config`).
//!
//! Unknown elements are rejected so a typo never silently falls back to a default.
//! Whitespace around values is ignored and an empty element counts as unset.

use anyhow::{Context, Result, anyhow};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use super::paths::{ConfigSource, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use crate::engine::{DEFAULT_EXTENSIONS, DEFAULT_MAX_DEPTH, ExtensionSet};
use crate::fs_ops::DEFAULT_MAX_ATTEMPTS;
use crate::platform::{restrict_dir, restrict_file, write_private_new};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    #[serde(default, deserialize_with = "de_trimmed_opt")]
    max_depth: Option<usize>,
    #[serde(default)]
    allowed_extensions: Option<String>,
    #[serde(default, deserialize_with = "de_trimmed_opt")]
    max_collision_attempts: Option<u32>,
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    log_dir: Option<String>,
    #[serde(default)]
    trace_file: Option<String>,
}

// Numbers may be padded with whitespace/newlines; an empty element is "unset".
fn de_trimmed_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

// Map XmlConfig -> Config, starting from defaults.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();
    if let Some(d) = parsed.max_depth {
        cfg.max_depth = d;
    }
    if let Some(list) = non_empty(parsed.allowed_extensions.as_deref()) {
        cfg.allowed_extensions = ExtensionSet::parse(list);
    }
    if let Some(n) = parsed.max_collision_attempts {
        cfg.max_collision_attempts = n;
    }
    if let Some(s) = non_empty(parsed.log_level.as_deref()) {
        cfg.log_level = s.parse::<LogLevel>().map_err(|e| anyhow!(e))?;
    }
    cfg.log_dir = non_empty(parsed.log_dir.as_deref()).map(PathBuf::from);
    cfg.trace_file = non_empty(parsed.trace_file.as_deref()).map(PathBuf::from);
    Ok(cfg)
}

/// Parse a config document.
pub fn parse_config_xml(contents: &str) -> Result<Config> {
    let parsed: XmlConfig = if contents.trim().is_empty() {
        XmlConfig::default()
    } else {
        from_xml_str(contents).context("parse config xml")?
    };
    xml_to_config(parsed)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    parse_config_xml(&contents).with_context(|| format!("in config file '{}'", path.display()))
}

/// Load the config for `source`. A missing default file means built-in defaults;
/// a missing explicit file (flag or env) is an error.
pub fn load_config(source: &ConfigSource) -> Result<Config> {
    let path = source.path();
    if !path.exists() {
        if source.is_explicit() {
            return Err(anyhow!("config file not found: {}", path.display()));
        }
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(Config::default());
    }
    debug!(path = %path.display(), "loading config");
    load_config_from_xml_path(path)
}

/// Write the commented template config at `path`. Refuses symlinked ancestors and
/// existing files; the file is created 0600 (dir 0700) on Unix.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        return Err(anyhow!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        ));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
        let _ = restrict_dir(parent);
    }

    let content = format!(
        "<!--\n  archive_rename configuration (XML)\n\n  Fields (all optional):\n    max_depth               -> deepest allowed file depth below the root (root files are 0)\n    allowed_extensions      -> comma or space separated list, case-insensitive\n    max_collision_attempts  -> _dupN suffixes tried before giving up\n    log_level               -> quiet | normal | info | debug\n    log_dir                 -> where transaction logs go (default: the root being renamed;\n                               must not be a directory inside the root)\n    trace_file              -> diagnostics log file (optional; stdout/stderr still used)\n\n  Notes:\n    - CLI flags override XML values.\n-->\n<config>\n  <max_depth>{}</max_depth>\n  <allowed_extensions>{}</allowed_extensions>\n  <max_collision_attempts>{}</max_collision_attempts>\n  <log_level>normal</log_level>\n  <log_dir></log_dir>\n  <trace_file></trace_file>\n</config>\n",
        DEFAULT_MAX_DEPTH,
        DEFAULT_EXTENSIONS.join(","),
        DEFAULT_MAX_ATTEMPTS,
    );

    write_private_new(path, content.as_bytes())?;
    let _ = restrict_file(path);

    info!("Created template config at {}", path.display());
    Ok(())
}
