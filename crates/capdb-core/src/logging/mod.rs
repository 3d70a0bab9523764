//! Logging setup for the `capdb` binary.
//!
//! - stdout is reserved for command output
//! - stderr receives all log output, human-readable or JSON lines
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is up to the binary (or the embedding application).

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use std::io::IsTerminal;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events the default filter lets through.
const LOG_TARGETS: [&str; 3] = ["capdb_core", "capdb_store", "capdb_config"];

/// Filter directive for `level` over this workspace's crates.
pub fn filter_directive(level: LogLevel) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the logging subsystem.
///
/// `RUST_LOG`, when set, replaces the level-derived filter. Calling this
/// twice is harmless; the second call is ignored.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config.level)));

    let result = match config.format {
        LogFormat::Human => {
            let builder = fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                builder.try_init()
            } else {
                builder.without_time().try_init()
            }
        }
        LogFormat::Jsonl => fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_covers_workspace_crates() {
        assert_eq!(
            filter_directive(LogLevel::Debug),
            "capdb_core=debug,capdb_store=debug,capdb_config=debug"
        );
    }

    #[test]
    fn init_twice_is_harmless() {
        let config = LogConfig::default().with_level(LogLevel::Off);
        init_logging(&config);
        init_logging(&config.with_format(LogFormat::Jsonl));
    }
}
