//! Error types for hash store operations.

use thiserror::Error;

/// Errors that can occur while reading or writing a hash store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the store magic
    #[error("not a capability store (bad magic)")]
    BadMagic,

    /// Unknown or unsupported store version
    #[error("unsupported store version: {version} (supported: {supported})")]
    UnsupportedVersion { version: u32, supported: u32 },

    /// File ended before the declared content
    #[error("truncated store: {0}")]
    Truncated(String),

    /// Trailing digest does not match content
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Key absent from the store
    #[error("key not found: {0}")]
    NotFound(String),

    /// Shadow entries point back at themselves
    #[error("shadow chain for '{0}' never reaches a record")]
    ShadowLoop(String),

    /// Keys must be non-empty
    #[error("empty key")]
    EmptyKey,

    /// Key inserted twice
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A length or count does not fit the format's 32-bit fields
    #[error("{what} of {len} exceeds the store format limit")]
    TooLarge { what: &'static str, len: usize },
}

impl StoreError {
    /// True when the file could not be interpreted as a store at all.
    ///
    /// Callers that keep a flat-text fallback treat these as "not a store".
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self,
            StoreError::Io(_)
                | StoreError::BadMagic
                | StoreError::UnsupportedVersion { .. }
                | StoreError::Truncated(_)
                | StoreError::ChecksumMismatch { .. }
        )
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
