//! Configuration file management for smartzone.
//!
//! Reads/writes `~/.smartzone/config.toml` with control channel settings,
//! the talkgroup name table, log output and the call session window.
//! Every key is optional; unknown keys are rejected.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::SESSION_WINDOW;
use crate::types::{Result, SmartZoneError};

/// Full configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub control_channel: ControlChannelConfig,
    pub groups: GroupsConfig,
    pub log: LogConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlChannelConfig {
    /// Control channel frequency, informational for the monitor
    pub frequency_mhz: Option<f64>,
    /// Symbols per second of the recorded bit stream
    pub symbol_rate: u32,
}

impl Default for ControlChannelConfig {
    fn default() -> Self {
        ControlChannelConfig {
            frequency_mhz: None,
            symbol_rate: 3600,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupsConfig {
    /// Talkgroup name CSV
    pub csv: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Append event lines here instead of stdout
    pub file: Option<PathBuf>,
    pub include_date: bool,
    /// Drop a line identical to one written less than a second ago
    pub suppress_repeats: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            file: None,
            include_date: true,
            suppress_repeats: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub window_secs: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            window_secs: SESSION_WINDOW,
        }
    }
}

/// Get the config directory path (`~/.smartzone/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".smartzone")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `path`. A missing file gives the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)?;
    let config = parse_config(&text)?;
    if config.session.window_secs <= 0.0 {
        return Err(SmartZoneError::Config(format!(
            "session.window_secs must be positive, got {}",
            config.session.window_secs
        )));
    }
    Ok(config)
}

/// Load `~/.smartzone/config.toml`.
pub fn load_default_config() -> Result<Config> {
    load_config(config_file())
}

/// Save config to `path`, creating its directory.
pub fn save_config(config: &Config, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let text = toml::to_string_pretty(config).map_err(|e| SmartZoneError::Config(e.to_string()))?;
    std::fs::write(path, format!("# smartzone configuration\n\n{text}"))?;
    Ok(path.to_path_buf())
}

fn parse_config(text: &str) -> Result<Config> {
    Ok(toml::from_str(text)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.control_channel.symbol_rate, 3600);
        assert!(config.groups.csv.is_none());
        assert!(config.log.include_date);
        assert!(config.log.suppress_repeats);
        assert_eq!(config.session.window_secs, 1.0);
    }

    #[test]
    fn test_parse_config() {
        let text = r#"
[control_channel]
frequency_mhz = 868.3375

[groups]
csv = "/etc/smartzone/groups.csv"

[log]
file = "/tmp/zone.log"
include_date = false

[session]
window_secs = 2.5
"#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.control_channel.frequency_mhz, Some(868.3375));
        assert_eq!(config.control_channel.symbol_rate, 3600);
        assert_eq!(
            config.groups.csv.as_deref(),
            Some(Path::new("/etc/smartzone/groups.csv"))
        );
        assert_eq!(config.log.file.as_deref(), Some(Path::new("/tmp/zone.log")));
        assert!(!config.log.include_date);
        assert!(config.log.suppress_repeats);
        assert_eq!(config.session.window_secs, 2.5);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse_config("[log]\nverbosity = 3\n").unwrap_err();
        assert!(matches!(err, SmartZoneError::Toml(_)));
        assert!(parse_config("webhook = \"x\"\n").is_err());
    }

    #[test]
    fn test_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_nonpositive_window_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nwindow_secs = 0.0\n").unwrap();
        assert!(matches!(
            load_config(&path).unwrap_err(),
            SmartZoneError::Config(_)
        ));
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.control_channel.frequency_mhz = Some(851.0125);
        config.groups.csv = Some(PathBuf::from("groups.csv"));
        config.log.suppress_repeats = false;
        config.session.window_secs = 1.5;

        let path = save_config(&config, dir.path().join("nested/config.toml")).unwrap();
        assert!(path.exists());
        assert_eq!(load_config(&path).unwrap(), config);
    }
}
