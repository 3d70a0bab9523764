//! Exit codes for the `capdb` CLI.
//!
//! Exit code ranges:
//! - 0-2: Lookup outcomes (parse outcome from code, not output)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Resolution failures and system errors

use crate::error::{CapError, ErrorKind};

/// Exit codes for capdb operations.
///
/// These codes are a stable contract for scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Lookup Outcomes (0-2)
    // ========================================================================
    /// Success
    Ok = 0,

    /// Name (or field) not found in any source
    NotFound = 1,

    /// Record found, but some `tc` references did not resolve
    Partial = 2,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    UsageError = 10,

    /// Settings file unreadable or invalid
    ConfigError = 11,

    // ========================================================================
    // Resolution / System Errors (20-29)
    // ========================================================================
    /// `tc` nesting exceeded the depth ceiling (usually a reference cycle)
    CycleExceeded = 20,

    /// I/O, allocation or hash store error
    SystemError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success (code 0 or a partial record).
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Ok | ExitCode::Partial)
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code indicates any error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Ok => "OK",
            ExitCode::NotFound => "NOT_FOUND",
            ExitCode::Partial => "OK_PARTIAL",
            ExitCode::UsageError => "ERR_USAGE",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::CycleExceeded => "ERR_CYCLE",
            ExitCode::SystemError => "ERR_SYSTEM",
        }
    }
}

impl From<&CapError> for ExitCode {
    fn from(err: &CapError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => ExitCode::NotFound,
            ErrorKind::CycleExceeded => ExitCode::CycleExceeded,
            ErrorKind::System => ExitCode::SystemError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
