use config::builder::DefaultState;
use config::{Config, ConfigBuilder};
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Prefix for environment overrides, e.g. `OMBRUK_DATABASE__URL`.
pub const ENV_PREFIX: &str = "OMBRUK";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub scheduling: SchedulingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u8,
    pub connect_timeout_secs: u64,
}

impl DatabaseConfig {
    /// ## Summary
    /// Returns the pool checkout timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Limits applied when a template is expanded into a series.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SchedulingConfig {
    /// Largest number of occurrences a single series may materialize.
    pub max_occurrences: usize,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            max_occurrences: 10_000,
        }
    }
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and an optional `config.toml`.
    /// Environment variables take precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration, deserializing it, or
    /// validating the result fails.
    pub fn load() -> CoreResult<Self> {
        let settings = defaults()?
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Self>()?;

        settings.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Rejects settings that would make the service unusable.
    ///
    /// ## Errors
    /// Returns `CoreError::ConfigError` naming the offending key.
    pub fn validate(&self) -> CoreResult<()> {
        if self.database.max_connections == 0 {
            return Err(CoreError::ConfigError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.scheduling.max_occurrences == 0 {
            return Err(CoreError::ConfigError(
                "scheduling.max_occurrences must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// ## Summary
/// Returns a config builder seeded with every default value.
///
/// ## Errors
/// Returns an error if a default cannot be registered.
pub fn defaults() -> CoreResult<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("database.max_connections", 4)?
        .set_default("database.connect_timeout_secs", 30)?
        .set_default("logging.level", "info")?
        .set_default("scheduling.max_occurrences", 10_000)?)
}

/// ## Summary
/// Loads configuration from a `.env` file, environment variables and `config.toml`.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> CoreResult<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
