//! Configuration Module
//!
//! Handles optional configuration loading from Java-style .properties files (KEY=VALUE format).
//! The probe runs without any file at all; the endpoint itself always comes from the command line.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Instruments subscribed when no `SYMBOLS` property is given.
pub const DEFAULT_SYMBOLS: [&str; 3] = ["600000", "600002", "AG2312"];

/// Properties file looked up in the working directory.
pub const CONFIG_FILE: &str = "mdping.properties";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse property '{key}': {reason}")]
    ParseError { key: String, reason: String },
}

/// Probe configuration
///
/// Property names: SYMBOLS, DWELL_SECONDS, BROKER_ID, USER_ID, PASSWORD,
/// REQUEST_QUEUE_SIZE, CONNECT_TIMEOUT_MS
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub symbols: Vec<String>,
    pub dwell_seconds: u64,
    pub broker_id: String,
    pub user_id: String,
    pub password: String,
    pub request_queue_size: usize,
    pub connect_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            dwell_seconds: 3,
            broker_id: String::new(),
            user_id: String::new(),
            password: String::new(),
            request_queue_size: 1024,
            connect_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Parse a Java-style .properties file into a HashMap.
    /// Skips blank lines and lines starting with '#'.
    fn parse_properties(content: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = trimmed.split_once('=') {
                map.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        map
    }

    fn parse_number<T: FromStr>(
        props: &HashMap<String, String>,
        key: &str,
        default: T,
    ) -> Result<T, ConfigError> {
        match props.get(key) {
            Some(v) => v.parse().map_err(|_| ConfigError::ParseError {
                key: key.into(),
                reason: format!("invalid {}: {}", std::any::type_name::<T>(), v),
            }),
            None => Ok(default),
        }
    }

    /// Load configuration from a .properties file (Java KEY=VALUE format).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_properties_str(&content)
    }

    /// Parse config from a properties-format string.
    pub fn from_properties_str(content: &str) -> Result<Self, ConfigError> {
        let props = Self::parse_properties(content);
        let defaults = Config::default();

        let symbols = match props.get("SYMBOLS") {
            Some(v) => {
                let symbols: Vec<String> = v
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                if symbols.is_empty() {
                    return Err(ConfigError::ParseError {
                        key: "SYMBOLS".into(),
                        reason: "no instrument ids listed".into(),
                    });
                }
                symbols
            }
            None => defaults.symbols,
        };

        let request_queue_size =
            Self::parse_number(&props, "REQUEST_QUEUE_SIZE", defaults.request_queue_size)?;
        if request_queue_size == 0 {
            return Err(ConfigError::ParseError {
                key: "REQUEST_QUEUE_SIZE".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Config {
            symbols,
            dwell_seconds: Self::parse_number(&props, "DWELL_SECONDS", defaults.dwell_seconds)?,
            broker_id: props.get("BROKER_ID").cloned().unwrap_or(defaults.broker_id),
            user_id: props.get("USER_ID").cloned().unwrap_or(defaults.user_id),
            password: props.get("PASSWORD").cloned().unwrap_or(defaults.password),
            request_queue_size,
            connect_timeout_ms: Self::parse_number(
                &props,
                "CONNECT_TIMEOUT_MS",
                defaults.connect_timeout_ms,
            )?,
        })
    }

    /// Load `mdping.properties` from the working directory, falling back to defaults.
    pub fn load_or_default() -> Self {
        if Path::new(CONFIG_FILE).exists() {
            match Self::load(CONFIG_FILE) {
                Ok(config) => {
                    log::info!("Loaded configuration from {}", CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                }
            }
        }

        log::debug!("No {} found, using defaults", CONFIG_FILE);
        Self::default()
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_secs(self.dwell_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Log all configuration parameters for debugging
    pub fn log_config(&self) {
        log::debug!("Configuration:");
        log::debug!("  symbols: {:?}", self.symbols);
        log::debug!("  dwell_seconds: {}", self.dwell_seconds);
        log::debug!("  broker_id: {:?}", self.broker_id);
        log::debug!("  user_id: {:?}", self.user_id);
        log::debug!("  request_queue_size: {}", self.request_queue_size);
        log::debug!("  connect_timeout: {} ms", self.connect_timeout_ms);
    }
}
