//! Config module.
//! Provides configuration types, config path resolution, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{
    CONFIG_ENV, CONFIG_FILE_NAME, ConfigSource, default_config_path, path_has_symlink_ancestor,
    resolve_config_path,
};
pub use types::{Config, LogLevel};
pub use validate::{MAX_DEPTH_LIMIT, validate_log_dir, validate_root};
pub use xml::{create_template_config, load_config, load_config_from_xml_path, parse_config_xml};
