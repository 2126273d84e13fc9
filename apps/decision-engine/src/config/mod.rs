//! Configuration loading and validation for the decision engine.
//!
//! Configuration is a single YAML document split into sections, one
//! submodule per section. Every field carries a serde default so a
//! minimal config file (or none of the optional sections) still yields
//! a runnable engine.
//!
//! # Usage
//!
//! ```rust,ignore
//! use decision_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//! ```

mod engine;
mod observability;
mod persistence;
mod resilience;
mod risk;
mod services;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::EngineConfig;
pub use observability::LoggingConfig;
pub use persistence::PersistenceConfig;
pub use resilience::ResilienceConfig;
pub use risk::RiskConfig;
pub use services::{AgentServiceConfig, ServicesConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Orchestration settings: instruments, account, cycle cadence.
    pub engine: EngineConfig,
    /// Downstream service endpoints.
    pub services: ServicesConfig,
    /// Retry and circuit breaker settings.
    #[serde(default)]
    pub resilience: ResilienceConfig,
    /// Risk policy defaults and learning bounds.
    #[serde(default)]
    pub risk: RiskConfig,
    /// Data directories for policy state and audit history.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Load configuration from a YAML file.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml_bw::from_str(yaml)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.engine.instruments.is_empty() {
        return Err(ConfigError::ValidationError(
            "engine.instruments must not be empty".to_string(),
        ));
    }

    if config.services.agents.is_empty() {
        return Err(ConfigError::ValidationError(
            "services.agents must not be empty".to_string(),
        ));
    }

    if config.resilience.max_retries == 0 {
        return Err(ConfigError::ValidationError(
            "resilience.max_retries must be at least 1".to_string(),
        ));
    }

    if config.resilience.failure_threshold == 0 {
        return Err(ConfigError::ValidationError(
            "resilience.failure_threshold must be at least 1".to_string(),
        ));
    }

    config.risk.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = r"
engine:
  instruments: [AAPL, MSFT]
  account_id: 1
services:
  agents:
    - name: technical-agent
      class: technical
      base_url: http://localhost:8001
  execution_url: http://localhost:8002
  ledger_url: http://localhost:8003
";

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let config = load_config_from_string(MINIMAL_YAML).unwrap();

        assert_eq!(config.engine.instruments, vec!["AAPL", "MSFT"]);
        assert_eq!(config.resilience.max_retries, 3);
        assert_eq!(config.resilience.failure_threshold, 5);
        assert!(config.services.learning_url.is_none());
    }

    #[test]
    fn test_empty_instruments_rejected() {
        let yaml = MINIMAL_YAML.replace("[AAPL, MSFT]", "[]");
        let error = load_config_from_string(&yaml).unwrap_err();
        assert!(matches!(error, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_invalid_risk_fraction_rejected() {
        let yaml = format!("{MINIMAL_YAML}\nrisk:\n  risk_per_trade: 1.5\n");
        let error = load_config_from_string(&yaml).unwrap_err();
        assert!(matches!(error, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let yaml = format!("{MINIMAL_YAML}\nresilience:\n  max_retries: 0\n");
        let error = load_config_from_string(&yaml).unwrap_err();
        assert!(matches!(error, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let error = load_config_from_string("engine: [not a map").unwrap_err();
        assert!(matches!(error, ConfigError::ParseError(_)));
    }
}
