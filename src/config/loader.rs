//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! configuration from YAML files.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{EngineError, EngineResult};

use super::types::EngineConfig;

/// Name of the configuration file inside a configuration directory.
pub const CONFIG_FILE_NAME: &str = "engine.yaml";

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// └── engine.yaml   # Schedule metadata and per-variant rates
/// ```
///
/// # Example
///
/// ```no_run
/// use placement_billing::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// println!("Loaded schedule: {}", loader.config().schedule.name);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if `engine.yaml` is missing, is not valid YAML, or
    /// fails the sanity checks in [`ConfigLoader::validate`].
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref().join(CONFIG_FILE_NAME);
        let config = Self::load_yaml::<EngineConfig>(&path)?;
        Self::validate(&config, &path.display().to_string())?;

        debug!(
            schedule = %config.schedule.name,
            version = %config.schedule.version,
            "Loaded engine configuration"
        );
        Ok(Self { config })
    }

    /// Wraps an in-memory configuration.
    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Rejects divisors of zero and rates outside `[0, 1)`.
    fn validate(config: &EngineConfig, path: &str) -> EngineResult<()> {
        let parse_error = |message: &str| EngineError::ConfigParseError {
            path: path.to_string(),
            message: message.to_string(),
        };

        if config.nanny.working_days_per_month == 0
            || config.maternity_nurse.cycle_length_days == 0
            || config.maternity_nurse.working_days_per_cycle == 0
            || config.substitute.fee_day_divisor == 0
            || config.substitute.salary_day_divisor == 0
        {
            return Err(parse_error("day divisors must be positive"));
        }

        let rates = [
            config.nanny.management_fee_rate,
            config.nanny.first_cycle_service_fee_rate,
            config.maternity_nurse.bonus_tier_rate,
            config.maternity_nurse.bonus_rate,
        ];
        if rates
            .iter()
            .any(|r| r.is_sign_negative() || *r >= rust_decimal::Decimal::ONE)
        {
            return Err(parse_error("rates must be in [0, 1)"));
        }
        Ok(())
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::from_config(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/default"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.config().nanny.working_days_per_month, 26);
        assert_eq!(loader.config().nanny.management_fee_rate, dec("0.10"));
    }

    #[test]
    fn test_shipped_file_matches_default() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        assert_eq!(loader.config(), &EngineConfig::default());
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(EngineError::ConfigNotFound { path }) => {
                assert!(path.contains("engine.yaml"));
            }
            other => panic!("Expected ConfigNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_divisor() {
        let mut config = EngineConfig::default();
        config.substitute.fee_day_divisor = 0;
        let result = ConfigLoader::validate(&config, "engine.yaml");
        assert!(matches!(result, Err(EngineError::ConfigParseError { .. })));
    }

    #[test]
    fn test_validate_rejects_rate_above_one() {
        let mut config = EngineConfig::default();
        config.maternity_nurse.bonus_rate = dec("1.5");
        let result = ConfigLoader::validate(&config, "engine.yaml");
        match result {
            Err(EngineError::ConfigParseError { message, .. }) => {
                assert!(message.contains("rates"));
            }
            other => panic!("Expected ConfigParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_default_loader_uses_default_config() {
        let loader = ConfigLoader::default();
        assert_eq!(loader.config().maternity_nurse.bonus_tier_rate, dec("0.20"));
    }
}
