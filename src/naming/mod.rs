//! Name computation (pure, no I/O).
//! - `sanitize` canonicalizes directory names to `[a-z0-9._-]`.
//! - `natural_cmp` orders file names with embedded numbers numerically.
//! - `NamingContext` derives sequence file names from the ancestor chain.

mod context;
mod natural;
mod sanitize;

pub use context::NamingContext;
pub use natural::natural_cmp;
pub use sanitize::{FALLBACK_NAME, is_canonical, sanitize};
