//! Error types for capability resolution.

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for resolver operations.
pub type Result<T> = std::result::Result<T, CapError>;

/// Broad error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The name is absent from every source. Recoverable.
    NotFound,
    /// I/O, allocation or store failure. Fatal for the call.
    System,
    /// The reference depth ceiling was hit. Fatal for the call.
    CycleExceeded,
}

/// Errors that can occur while resolving or reading capability records.
#[derive(Error, Debug)]
pub enum CapError {
    /// No source holds a record (or field) with this name
    #[error("capability not found: {name}")]
    NotFound { name: String },

    /// Reading a source failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record buffer could not grow
    #[error("allocation failure: {0}")]
    Alloc(#[from] TryReserveError),

    /// Reference chain deeper than the configured ceiling
    #[error("reference depth {depth} exceeds limit {max} while resolving '{name}'")]
    CycleExceeded {
        name: String,
        depth: usize,
        max: usize,
    },

    /// A hash store opened fine but could not answer a lookup
    #[error("hash store error on {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: capdb_store::StoreError,
    },
}

impl CapError {
    pub fn not_found(name: impl Into<String>) -> Self {
        CapError::NotFound { name: name.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CapError::NotFound { .. } => ErrorKind::NotFound,
            CapError::CycleExceeded { .. } => ErrorKind::CycleExceeded,
            CapError::Io { .. } | CapError::Alloc(_) | CapError::Store { .. } => {
                ErrorKind::System
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_system(&self) -> bool {
        self.kind() == ErrorKind::System
    }
}
