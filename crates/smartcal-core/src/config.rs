use anyhow::{Context, Result};
use chrono::{FixedOffset, Local, Offset};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the local key-value database
    pub data_dir: PathBuf,

    /// Snapshot persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Calendar display settings
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// How snapshot write failures reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Failures are returned as `StorageError`.
    #[default]
    Strict,
    /// Failures are logged and swallowed.
    BestEffort,
}

/// What to do when the stored snapshot cannot be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CorruptSnapshotPolicy {
    /// Start from an empty calendar, log only.
    #[default]
    Recover,
    /// Start from an empty calendar, keep a backup and tell the user.
    Report,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key the snapshot is stored under
    #[serde(default = "default_storage_key")]
    pub key: String,

    /// Quiet period before a scheduled write fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub write_policy: WritePolicy,

    #[serde(default)]
    pub corrupt_policy: CorruptSnapshotPolicy,

    /// Capacity of the key-value store in bytes (unlimited when unset)
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

fn default_storage_key() -> String {
    "smart-calendar-data".to_string()
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
            debounce_ms: default_debounce_ms(),
            write_policy: WritePolicy::default(),
            corrupt_policy: CorruptSnapshotPolicy::default(),
            quota_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Display zone as minutes east of UTC (machine local offset when unset)
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

impl CalendarConfig {
    /// Resolve the zone used for day grouping and month navigation.
    pub fn display_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .and_then(offset_from_minutes)
            .unwrap_or_else(|| Local::now().offset().fix())
    }
}

/// `None` when the offset is outside the ±24h range chrono accepts.
fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

/// Unit system requested from the forecast provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Standard => "standard",
        }
    }
}

/// What happens to displayed forecast data when a refresh fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    KeepPrevious,
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Forecast API base URL
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// OpenWeatherMap API key (can be set via environment)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Language for condition descriptions
    #[serde(default = "default_weather_lang")]
    pub lang: String,

    #[serde(default)]
    pub units: Units,

    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_weather_lang() -> String {
    "en".to_string()
}

fn default_weather_timeout() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            api_key: None,
            lang: default_weather_lang(),
            units: Units::default(),
            timeout_secs: default_weather_timeout(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl WeatherConfig {
    /// API key from the config file, falling back to `OPENWEATHER_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENWEATHER_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("smartcal");

        Self {
            data_dir,
            storage: StorageConfig::default(),
            calendar: CalendarConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.storage.key.trim().is_empty() {
            result.add_error("storage.key", "Storage key cannot be empty");
        }

        if self.storage.debounce_ms == 0 {
            result.add_warning(
                "storage.debounce_ms",
                "Debounce disabled, every change is written immediately",
            );
        } else if self.storage.debounce_ms > 10_000 {
            result.add_warning(
                "storage.debounce_ms",
                "Debounce longer than 10 seconds may lose recent changes",
            );
        }

        if self.storage.quota_bytes == Some(0) {
            result.add_error("storage.quota_bytes", "Quota must be greater than 0");
        }

        if let Some(minutes) = self.calendar.utc_offset_minutes {
            if offset_from_minutes(minutes).is_none() {
                result.add_error(
                    "calendar.utc_offset_minutes",
                    format!("Offset out of range: {} minutes", minutes),
                );
            }
        }

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        }

        if self.weather.resolved_api_key().is_none() {
            result.add_warning(
                "weather.api_key",
                "No weather API key - forecasts will be unavailable",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("smartcal");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn config_with_key() -> Config {
        let mut config = Config::default();
        config.weather.api_key = Some("test-key".to_string());
        config
    }

    #[test]
    fn test_valid_default_config() {
        let result = config_with_key().validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_default_storage_settings() {
        let config = Config::default();
        assert_eq!(config.storage.key, "smart-calendar-data");
        assert_eq!(config.storage.debounce_ms, 100);
        assert_eq!(config.storage.write_policy, WritePolicy::Strict);
        assert_eq!(config.storage.corrupt_policy, CorruptSnapshotPolicy::Recover);
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = config_with_key();
        config.weather.base_url = "ftp://api.example.com".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = config_with_key();
        config.weather.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "weather.base_url"));
    }

    #[test]
    fn test_zero_debounce_is_warning() {
        let mut config = config_with_key();
        config.storage.debounce_ms = 0;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "storage.debounce_ms"));
    }

    #[test]
    fn test_offset_out_of_range() {
        let mut config = config_with_key();
        config.calendar.utc_offset_minutes = Some(24 * 60);
        let result = config.validate();
        assert!(!result.is_valid());
    }

    #[test]
    fn test_huge_offset_is_reported_not_overflowed() {
        let mut config = config_with_key();
        config.calendar.utc_offset_minutes = Some(100_000_000);
        let result = config.validate();
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "calendar.utc_offset_minutes"));

        config.calendar.utc_offset_minutes = Some(i32::MIN);
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_huge_offset_falls_back_to_local() {
        let calendar = CalendarConfig {
            utc_offset_minutes: Some(100_000_000),
        };
        assert_eq!(calendar.display_offset(), Local::now().offset().fix());
    }

    #[test]
    fn test_display_offset_from_minutes() {
        let calendar = CalendarConfig {
            utc_offset_minutes: Some(-180),
        };
        assert_eq!(calendar.display_offset().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            data_dir = "/tmp/smartcal"

            [storage]
            write_policy = "best_effort"

            [weather]
            units = "imperial"
            failure_policy = "reset"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.write_policy, WritePolicy::BestEffort);
        assert_eq!(config.storage.debounce_ms, 100);
        assert_eq!(config.weather.units.as_query(), "imperial");
        assert_eq!(config.weather.failure_policy, FailurePolicy::Reset);
        assert_eq!(config.weather.lang, "en");
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
