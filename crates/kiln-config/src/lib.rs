//! Parse `kiln.toml` and resolve it into an immutable [`BuildConfig`].

pub mod config;
pub mod manifest;

pub use config::{BuildConfig, ConfigError, PackageConfig, ProjectConfig, MANIFEST_FILE};
pub use manifest::Manifest;
