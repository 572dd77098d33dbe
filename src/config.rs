//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and key has a default, so an empty file (or no file at
//! all, via [`Config::default`]) is a valid configuration.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{RecorderError, Result};
use crate::local_time::{is_known_zone, lookup_from_name, LocalTimeResolver, POSITION};
use crate::storage::SessionStore;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub recorder: RecorderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Recording loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RecorderConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks to wait after a flight is detected before the header is taken
    #[serde(default = "default_load_delay_ticks")]
    pub load_delay_ticks: u32,
}

/// Session storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
}

/// Flight state detection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_position_read_attempts")]
    pub position_read_attempts: u32,
}

/// Local time resolution configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimeConfig {
    /// `"position"` (zone at the aircraft position), `"nautical"` or an
    /// IANA zone name such as `"Europe/Berlin"`
    #[serde(default = "default_zone")]
    pub zone: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

// Default value functions
fn default_tick_interval_ms() -> u64 { 1000 }
fn default_load_delay_ticks() -> u32 { 30 }

fn default_data_dir() -> PathBuf { PathBuf::from("./data") }
fn default_export_dir() -> PathBuf { PathBuf::from("./data_csv") }

fn default_position_read_attempts() -> u32 { 2 }

fn default_zone() -> String { POSITION.to_string() }
fn default_max_attempts() -> u32 { 10 }

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            load_delay_ticks: default_load_delay_ticks(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            export_dir: default_export_dir(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            position_read_attempts: default_position_read_attempts(),
        }
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            zone: default_zone(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> RecorderError {
    RecorderError::Config(toml::de::Error::custom(message))
}

impl StorageConfig {
    /// Open the session store at the configured directories
    pub fn open_store(&self) -> Result<SessionStore> {
        SessionStore::open(&self.data_dir, &self.export_dir)
    }
}

impl TimeConfig {
    /// Build the local time resolver for the configured zone
    pub fn resolver(&self) -> Result<LocalTimeResolver> {
        let lookup = lookup_from_name(&self.zone)
            .ok_or_else(|| invalid(format!("unknown time zone {:?}", self.zone)))?;
        Ok(LocalTimeResolver::new(lookup, self.max_attempts))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use flight_recorder::config::Config;
    ///
    /// let config = Config::load("recorder.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.recorder.tick_interval_ms == 0 || self.recorder.tick_interval_ms > 60000 {
            return Err(invalid("tick_interval_ms must be between 1 and 60000"));
        }

        if self.recorder.load_delay_ticks > 600 {
            return Err(invalid("load_delay_ticks must be between 0 and 600"));
        }

        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(invalid("data_dir cannot be empty"));
        }

        if self.storage.export_dir.as_os_str().is_empty() {
            return Err(invalid("export_dir cannot be empty"));
        }

        // Exported CSVs would otherwise be scanned as sessions
        if self.storage.export_dir == self.storage.data_dir {
            return Err(invalid("export_dir must differ from data_dir"));
        }

        if self.detector.position_read_attempts == 0 || self.detector.position_read_attempts > 10 {
            return Err(invalid("position_read_attempts must be between 1 and 10"));
        }

        if !is_known_zone(&self.time.zone) {
            return Err(invalid(format!(
                "time zone {:?} must be \"position\", \"nautical\" or an IANA zone name",
                self.time.zone
            )));
        }

        if self.time.max_attempts == 0 || self.time.max_attempts > 1000 {
            return Err(invalid("max_attempts must be between 1 and 1000"));
        }

        if let Some(log_dir) = &self.logging.log_dir {
            if log_dir.as_os_str().is_empty() {
                return Err(invalid("log_dir cannot be empty when set"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        let toml_content = r#"
[recorder]
tick_interval_ms = 500
load_delay_ticks = 0

[storage]
data_dir = "/var/lib/flight-recorder/data"

[time]
zone = "America/Toronto"

[logging]
log_dir = "/var/log/flight-recorder"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.recorder.tick_interval_ms, 500);
        assert_eq!(config.recorder.load_delay_ticks, 0);
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/flight-recorder/data"));
        assert_eq!(config.storage.export_dir, default_export_dir());
        assert_eq!(config.detector.position_read_attempts, 2);
        assert_eq!(config.time.zone, "America/Toronto");
        assert_eq!(config.logging.log_dir, Some(PathBuf::from("/var/log/flight-recorder")));
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.recorder.tick_interval_ms, 1000);
        assert_eq!(config.time.zone, "position");
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[recorder]\ntick_interval_ms = 0\n").unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(Config::load(temp_file.path()), Err(RecorderError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/recorder.toml"),
            Err(RecorderError::Io(_))
        ));
    }

    #[test]
    fn test_tick_interval_zero() {
        let mut config = Config::default();
        config.recorder.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval_too_high() {
        let mut config = Config::default();
        config.recorder.tick_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_delay_too_high() {
        let mut config = Config::default();
        config.recorder.load_delay_ticks = 601;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_delay_zero_is_valid() {
        let mut config = Config::default();
        config.recorder.load_delay_ticks = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_data_dir() {
        let mut config = Config::default();
        config.storage.data_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_export_dir_same_as_data_dir() {
        let mut config = Config::default();
        config.storage.export_dir = config.storage.data_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_position_read_attempts_range() {
        let mut config = Config::default();
        config.detector.position_read_attempts = 0;
        assert!(config.validate().is_err());
        config.detector.position_read_attempts = 11;
        assert!(config.validate().is_err());
        config.detector.position_read_attempts = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_zone() {
        let mut config = Config::default();
        config.time.zone = "Atlantis/Capital".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_attempts_zero() {
        let mut config = Config::default();
        config.time.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_set() {
        let mut config = Config::default();
        config.logging.log_dir = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_time_resolver_from_config() {
        let mut time = TimeConfig::default();
        assert!(time.resolver().is_ok());

        time.zone = "Asia/Tokyo".to_string();
        assert!(time.resolver().is_ok());

        time.zone = "Nowhere/Special".to_string();
        assert!(matches!(time.resolver(), Err(RecorderError::Config(_))));
    }

    #[test]
    fn test_open_store_creates_data_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = StorageConfig {
            data_dir: dir.path().join("data"),
            export_dir: dir.path().join("data_csv"),
        };

        let store = storage.open_store().unwrap();
        assert!(store.data_dir().is_dir());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_tick_interval_ms(), 1000);
        assert_eq!(default_load_delay_ticks(), 30);
        assert_eq!(default_data_dir(), PathBuf::from("./data"));
        assert_eq!(default_export_dir(), PathBuf::from("./data_csv"));
        assert_eq!(default_position_read_attempts(), 2);
        assert_eq!(default_zone(), "position");
        assert_eq!(default_max_attempts(), 10);
    }
}
