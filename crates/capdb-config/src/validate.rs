//! Settings validation errors and semantic validation.

use crate::{Settings, CONFIG_SCHEMA_VERSION, MAX_DEPTH_LIMIT};
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Settings validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate settings semantically.
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    if settings.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: CONFIG_SCHEMA_VERSION.to_string(),
            actual: settings.schema_version.clone(),
        });
    }

    if settings.max_depth == 0 || settings.max_depth > MAX_DEPTH_LIMIT {
        return Err(ValidationError::InvalidValue {
            field: "max_depth".to_string(),
            message: format!(
                "must be between 1 and {MAX_DEPTH_LIMIT}, got {}",
                settings.max_depth
            ),
        });
    }

    if let Some(idx) = settings
        .sources
        .iter()
        .position(|p| p.as_os_str().is_empty())
    {
        return Err(ValidationError::InvalidValue {
            field: format!("sources[{idx}]"),
            message: "empty path".to_string(),
        });
    }

    Ok(())
}
