//! Engine configuration.

use serde::Deserialize;

use domain::models::command::DEFAULT_COMMAND_WINDOW;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub invites: InviteConfig,

    #[serde(default)]
    pub find_requests: FindRequestConfig,

    #[serde(default)]
    pub commands: CommandConfig,

    #[serde(default)]
    pub distance: DistanceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Invite code settings.
#[derive(Debug, Clone, Deserialize)]
pub struct InviteConfig {
    /// Hours until a freshly generated invite code expires.
    #[serde(default = "default_invite_expiry_hours")]
    pub expiry_hours: i64,
}

/// Find-request workflow settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FindRequestConfig {
    /// Seconds a pending find request stays answerable before lazy expiry.
    #[serde(default = "default_find_request_ttl")]
    pub ttl_secs: i64,
}

/// Command broadcast settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Size of the live command window (most recent N by timestamp).
    #[serde(default = "default_command_window")]
    pub window: usize,
}

/// Distance scheduler settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DistanceConfig {
    /// Minimum milliseconds between global distance calculations.
    #[serde(default = "default_distance_debounce_ms")]
    pub debounce_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_invite_expiry_hours() -> i64 {
    24
}
fn default_find_request_ttl() -> i64 {
    120
}
fn default_command_window() -> usize {
    DEFAULT_COMMAND_WINDOW
}
fn default_distance_debounce_ms() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            expiry_hours: default_invite_expiry_hours(),
        }
    }
}

impl Default for FindRequestConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_find_request_ttl(),
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            window: default_command_window(),
        }
    }
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_distance_debounce_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl EngineConfig {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration (optional)
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with FLOCK__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("FLOCK").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides, without
    /// relying on config files.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.invites.expiry_hours <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "invites.expiry_hours must be positive".to_string(),
            ));
        }
        if self.find_requests.ttl_secs <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "find_requests.ttl_secs must be positive".to_string(),
            ));
        }
        if self.commands.window == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "commands.window cannot be 0".to_string(),
            ));
        }
        if self.distance.debounce_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "distance.debounce_ms cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}
