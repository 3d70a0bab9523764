//! Database source and settings path discovery.
//!
//! Resolution order: CLI arguments → environment variables → settings file →
//! config dir → XDG paths → system default.

use crate::Settings;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a source list or settings file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Listed in the settings file.
    SettingsFile,

    /// Found under `CAPDB_CONFIG_DIR`.
    ConfigDir,

    /// Found in XDG config directory.
    XdgConfig,

    /// System-wide default under /etc.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::SettingsFile => write!(f, "settings file"),
            ConfigSource::ConfigDir => write!(f, "config dir"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Ordered database sources plus where the list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceList {
    pub paths: Vec<PathBuf>,
    pub origin: ConfigSource,
}

/// Environment variable names.
pub const ENV_DB_PATH: &str = "CAPDB_PATH";
pub const ENV_CONFIG_PATH: &str = "CAPDB_CONFIG";
pub const ENV_CONFIG_DIR: &str = "CAPDB_CONFIG_DIR";

/// Standard file names.
const DATABASE_FILENAME: &str = "capabilities";
const SETTINGS_FILENAME: &str = "capdb.json";

/// Application name for XDG directories.
const APP_NAME: &str = "capdb";

/// Resolve the ordered database source list.
///
/// Resolution order:
/// 1. Explicit CLI paths (`--db`, repeatable)
/// 2. `CAPDB_PATH` (`:`-separated)
/// 3. `sources` from the settings file
/// 4. `CAPDB_CONFIG_DIR/capabilities`
/// 5. XDG config (`~/.config/capdb/capabilities`)
/// 6. `/etc/capabilities`
///
/// Steps 1–3 are taken as given: a listed source that does not exist is
/// skipped later by the resolver. Steps 4–5 only apply when the file exists.
pub fn resolve_sources(cli_paths: &[PathBuf], settings: Option<&Settings>) -> SourceList {
    let list = resolve_sources_inner(cli_paths, settings);
    debug!(origin = %list.origin, sources = ?list.paths, "Resolved database sources");
    list
}

fn resolve_sources_inner(cli_paths: &[PathBuf], settings: Option<&Settings>) -> SourceList {
    // 1. CLI arguments
    if !cli_paths.is_empty() {
        return SourceList {
            paths: cli_paths.to_vec(),
            origin: ConfigSource::CliArgument,
        };
    }

    // 2. Environment variable (path list)
    if let Some(value) = std::env::var_os(ENV_DB_PATH) {
        let paths: Vec<PathBuf> = std::env::split_paths(&value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        if !paths.is_empty() {
            return SourceList {
                paths,
                origin: ConfigSource::Environment,
            };
        }
    }

    // 3. Settings file
    if let Some(settings) = settings {
        if !settings.sources.is_empty() {
            return SourceList {
                paths: settings.sources.clone(),
                origin: ConfigSource::SettingsFile,
            };
        }
    }

    // 4. Config dir
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(DATABASE_FILENAME);
        if path.exists() {
            return SourceList {
                paths: vec![path],
                origin: ConfigSource::ConfigDir,
            };
        }
    }

    // 5. XDG config directory
    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(DATABASE_FILENAME);
        if path.exists() {
            return SourceList {
                paths: vec![path],
                origin: ConfigSource::XdgConfig,
            };
        }
    }

    // 6. System default
    SourceList {
        paths: vec![system_config_dir().join(DATABASE_FILENAME)],
        origin: ConfigSource::SystemConfig,
    }
}

/// Locate the settings file.
///
/// Resolution order:
/// 1. Explicit CLI path (if it exists)
/// 2. `CAPDB_CONFIG`
/// 3. `CAPDB_CONFIG_DIR/capdb.json`
/// 4. XDG config (`~/.config/capdb/capdb.json`)
/// 5. `/etc/capdb.json`
pub fn resolve_settings_path(cli_path: Option<&Path>) -> Option<(PathBuf, ConfigSource)> {
    // 1. CLI argument
    if let Some(path) = cli_path {
        if path.exists() {
            return Some((path.to_path_buf(), ConfigSource::CliArgument));
        }
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Some((path, ConfigSource::Environment));
        }
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(SETTINGS_FILENAME);
        if path.exists() {
            return Some((path, ConfigSource::ConfigDir));
        }
    }

    // 4. XDG config directory
    if let Some(dir) = xdg_config_dir() {
        let path = dir.join(SETTINGS_FILENAME);
        if path.exists() {
            return Some((path, ConfigSource::XdgConfig));
        }
    }

    // 5. System config
    let system_path = system_config_dir().join(SETTINGS_FILENAME);
    if system_path.exists() {
        return Some((system_path, ConfigSource::SystemConfig));
    }

    None
}

/// Get the XDG config directory for capdb.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::SettingsFile), "settings file");
        assert_eq!(format!("{}", ConfigSource::XdgConfig), "XDG config");
        assert_eq!(format!("{}", ConfigSource::SystemConfig), "system config");
    }

    #[test]
    fn test_cli_paths_win() {
        let cli = vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")];
        let settings = Settings {
            sources: vec![PathBuf::from("/tmp/c")],
            ..Settings::default()
        };
        let list = resolve_sources(&cli, Some(&settings));
        assert_eq!(list.origin, ConfigSource::CliArgument);
        assert_eq!(list.paths, cli);
    }

    #[test]
    fn test_system_config_dir() {
        assert_eq!(system_config_dir(), PathBuf::from("/etc"));
    }

    #[test]
    fn test_xdg_config_dir() {
        if let Some(path) = xdg_config_dir() {
            assert!(path.ends_with(APP_NAME));
        }
    }
}
