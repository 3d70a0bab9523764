//! capdb configuration loading and validation.
//!
//! This crate provides:
//! - Database source list discovery (CLI → env → settings → XDG → system)
//! - The optional `capdb.json` settings file
//! - Semantic validation of settings

pub mod resolve;
pub mod settings;
pub mod validate;

pub use resolve::{resolve_settings_path, resolve_sources, ConfigSource, SourceList};
pub use settings::{load_settings, ConfigError, LoadedSettings, Settings};
pub use validate::{validate_settings, ValidationError, ValidationResult};

/// Schema version for settings files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Reference depth ceiling used when nothing overrides it.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Largest depth ceiling a settings file may request.
pub const MAX_DEPTH_LIMIT: usize = 4096;
