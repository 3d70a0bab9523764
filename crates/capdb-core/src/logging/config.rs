//! Logging configuration.
//!
//! The level comes from `-v`/`-q`, else `CAPDB_LOG`, else `warn`. The format
//! comes from `--log-format`, else `CAPDB_LOG_FORMAT`, else human output.

use std::fmt;
use std::str::FromStr;

/// Environment variable holding the log level.
pub const ENV_LOG: &str = "CAPDB_LOG";
/// Environment variable holding the log format.
pub const ENV_LOG_FORMAT: &str = "CAPDB_LOG_FORMAT";

/// Log output format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per event.
    Jsonl,
}

impl LogFormat {
    const ALL: [LogFormat; 2] = [LogFormat::Human, LogFormat::Jsonl];

    pub fn name(self) -> &'static str {
        match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        }
    }
}

/// Severity threshold, named as `EnvFilter` directives name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    /// Fallbacks and partial records.
    #[default]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Off,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Level selected by `-v`/`-q` counts; `None` leaves it to the environment.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Option<Self> {
        match (quiet, verbose) {
            (true, _) => Some(LogLevel::Error),
            (false, 0) => None,
            (false, 1) => Some(LogLevel::Debug),
            (false, _) => Some(LogLevel::Trace),
        }
    }
}

fn parse_named<T: Copy>(
    all: &[T],
    name: fn(T) -> &'static str,
    s: &str,
    what: &str,
) -> Result<T, String> {
    all.iter()
        .copied()
        .find(|candidate| name(*candidate).eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown log {what}: {s}"))
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // `json` reads naturally next to `--format json`.
        if s.eq_ignore_ascii_case("json") {
            return Ok(LogFormat::Jsonl);
        }
        parse_named(&Self::ALL, Self::name, s, "format")
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_named(&Self::ALL, Self::name, s, "level")
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved logging settings for one process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Prefix human output with timestamps.
    pub timestamps: bool,
}

impl LogConfig {
    /// Read `CAPDB_LOG`/`CAPDB_LOG_FORMAT`, then apply the CLI choices.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::from_vars(
            std::env::var(ENV_LOG).ok().as_deref(),
            std::env::var(ENV_LOG_FORMAT).ok().as_deref(),
            cli_level,
            cli_format,
        )
    }

    /// As [`LogConfig::from_env`] with the variable values passed in.
    /// Values that do not parse are ignored.
    pub fn from_vars(
        env_level: Option<&str>,
        env_format: Option<&str>,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let parsed_level = env_level.and_then(|v| v.parse().ok());
        let parsed_format = env_format.and_then(|v| v.parse().ok());
        LogConfig {
            level: cli_level.or(parsed_level).unwrap_or_default(),
            format: cli_format.or(parsed_format).unwrap_or_default(),
            timestamps: false,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}
