//! The optional `capdb.json` settings file.

use crate::resolve::{resolve_settings_path, ConfigSource};
use crate::validate::{validate_settings, ValidationError};
use crate::{CONFIG_SCHEMA_VERSION, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during settings loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JSON in settings file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schema_version: String,

    /// Ordered database sources; empty means "discover".
    pub sources: Vec<PathBuf>,

    /// Reference depth ceiling.
    pub max_depth: usize,

    /// Try `<source>.db` before scanning the flat text.
    pub prefer_hash_store: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            sources: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            prefer_hash_store: true,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON string without validating them.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load and validate a settings file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings = Self::from_json(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        validate_settings(&settings)?;
        Ok(settings)
    }
}

/// Settings together with their provenance.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    /// Path of the settings file (None if using defaults).
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Locate and load the settings file, falling back to defaults.
pub fn load_settings(cli_path: Option<&Path>) -> Result<LoadedSettings, ConfigError> {
    match resolve_settings_path(cli_path) {
        Some((path, source)) => {
            let settings = Settings::from_file(&path)?;
            debug!(path = %path.display(), %source, "Loaded settings");
            Ok(LoadedSettings {
                settings,
                path: Some(path),
                source,
            })
        }
        None => Ok(LoadedSettings {
            settings: Settings::default(),
            path: None,
            source: ConfigSource::BuiltinDefault,
        }),
    }
}
