use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Engine configuration with validation
///
/// Zero disables the fetch size, result size limit, statement timeout and
/// keep-alive settings.
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[validate(schema(function = "validate_cache"))]
#[serde(default)]
pub struct EngineConfig {
    /// Whether pattern lookups are cached
    pub cache_enabled: bool,

    /// Maximum number of cached patterns (LRU eviction)
    #[validate(range(max = 1_000_000, message = "Cache size must be at most 1000000"))]
    pub cache_max_entries: usize,

    /// Rows fetched per round trip
    pub fetch_size: usize,

    /// Upper bound on rows per statement
    pub result_size_limit: u64,

    /// Statement timeout in seconds
    #[validate(range(max = 86_400, message = "Statement timeout must be at most one day"))]
    pub statement_timeout_secs: u64,

    /// Idle time after which a connection is probed before reuse
    pub keep_alive_secs: u64,

    /// Reconnect attempts after a lost connection
    #[validate(range(max = 10, message = "Reconnect attempts must be between 0 and 10"))]
    pub max_reconnect_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_max_entries: 1000,
            fetch_size: 0,
            result_size_limit: 0,
            statement_timeout_secs: 0,
            keep_alive_secs: 0,
            max_reconnect_attempts: 1,
        }
    }
}

fn validate_cache(config: &EngineConfig) -> Result<(), ValidationError> {
    if config.cache_enabled && config.cache_max_entries == 0 {
        let mut error = ValidationError::new("cache_capacity");
        error.message = Some("Cache is enabled but holds no entries".into());
        return Err(error);
    }
    Ok(())
}

impl EngineConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            cache_enabled: parse_env_var("RDBGRAPH_CACHE_ENABLED", defaults.cache_enabled)?,
            cache_max_entries: parse_env_var(
                "RDBGRAPH_CACHE_MAX_ENTRIES",
                defaults.cache_max_entries,
            )?,
            fetch_size: parse_env_var("RDBGRAPH_FETCH_SIZE", defaults.fetch_size)?,
            result_size_limit: parse_env_var(
                "RDBGRAPH_RESULT_SIZE_LIMIT",
                defaults.result_size_limit,
            )?,
            statement_timeout_secs: parse_env_var(
                "RDBGRAPH_STATEMENT_TIMEOUT_SECS",
                defaults.statement_timeout_secs,
            )?,
            keep_alive_secs: parse_env_var("RDBGRAPH_KEEP_ALIVE_SECS", defaults.keep_alive_secs)?,
            max_reconnect_attempts: parse_env_var(
                "RDBGRAPH_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file; missing keys keep their defaults
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

/// Parse an environment variable, falling back to a default when unset
fn parse_env_var<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Ok(value) = env::var(key) else {
        return Ok(default);
    };
    value.trim().parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
