use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

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
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory (preferences live here too)
    pub config_dir: PathBuf,

    /// Weather provider endpoints and credentials
    pub provider: ProviderConfig,

    /// Dashboard location set and refresh cadence
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Location search settings
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OpenWeatherMap API key. When absent, `OPENWEATHER_API_KEY` is read at
    /// startup; the environment value is never written back to the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL for current conditions and forecasts
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL for the geocoding API
    #[serde(default = "default_geo_url")]
    pub geo_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Environment variable consulted when the file has no API key
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_geo_url() -> String {
    "https://api.openweathermap.org/geo/1.0".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl ProviderConfig {
    /// API key from the file, falling back to `OPENWEATHER_API_KEY`
    pub fn resolved_api_key(&self) -> String {
        self.api_key_or(std::env::var(API_KEY_ENV).ok())
    }

    fn api_key_or(&self, env_key: Option<String>) -> String {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or(env_key)
            .unwrap_or_default()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            geo_url: default_geo_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Locations always shown after favorites and searches
    #[serde(default = "default_locations")]
    pub default_locations: Vec<String>,

    /// Multi-location refresh period in seconds (default: 5 minutes)
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    /// Single-location detail refresh period in seconds
    #[serde(default = "default_detail_refresh_secs")]
    pub detail_refresh_secs: u64,

    /// Maximum in-flight lookups while resolving the location set
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_locations() -> Vec<String> {
    ["London", "New York", "Tokyo", "Sydney", "Paris"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_refresh_secs() -> u64 {
    300
}

fn default_detail_refresh_secs() -> u64 {
    60
}

fn default_concurrency() -> usize {
    1
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_locations: default_locations(),
            refresh_secs: default_refresh_secs(),
            detail_refresh_secs: default_detail_refresh_secs(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before a typed query is sent
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Number of suggestions requested per query
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_search_limit() -> u32 {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            limit: default_search_limit(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            config_dir,
            provider: ProviderConfig::default(),
            dashboard: DashboardConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated() -> Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        self.validate_with_api_key(&self.provider.resolved_api_key())
    }

    fn validate_with_api_key(&self, api_key: &str) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.provider.base_url, "provider.base_url", &mut result);
        self.validate_url(&self.provider.geo_url, "provider.geo_url", &mut result);

        if api_key.trim().is_empty() {
            result.add_warning(
                "provider.api_key",
                "No API key configured; set OPENWEATHER_API_KEY",
            );
        }

        if self.provider.timeout_secs == 0 {
            result.add_error("provider.timeout_secs", "Timeout must be greater than 0");
        }

        if self.dashboard.concurrency == 0 {
            result.add_error(
                "dashboard.concurrency",
                "Concurrency must be at least 1",
            );
        }

        if self.dashboard.default_locations.is_empty() {
            result.add_warning(
                "dashboard.default_locations",
                "No default locations; an empty dashboard shows no data",
            );
        }

        if self.dashboard.refresh_secs < 10 {
            result.add_warning(
                "dashboard.refresh_secs",
                "Refresh period under 10 seconds may hit provider rate limits",
            );
        }

        if self.dashboard.detail_refresh_secs < 10 {
            result.add_warning(
                "dashboard.detail_refresh_secs",
                "Refresh period under 10 seconds may hit provider rate limits",
            );
        }

        if self.search.limit == 0 {
            result.add_error("search.limit", "Search limit must be at least 1");
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

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Path of the JSON file holding user preferences (unit, favorites, searches)
    pub fn preferences_path(&self) -> PathBuf {
        self.config_dir.join("preferences.json")
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("user config directory".to_string()))?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
