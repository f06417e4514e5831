//! Configuration parsing and validation for parkgate
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Service paths and the default tenant
//! - Default grace period, baseline rate and tariff tiers per category
//! - Validation with clear error messages

mod config;
mod schema;
mod validation;

pub use config::*;
pub use schema::*;
pub use validation::{validate_config, validate_settings, ValidationError};

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Config> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        tracing::debug!(error_count = errors.len(), "Config validation failed");
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Config::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use parkgate_api::{Tier, VehicleCategory};

    #[test]
    fn parse_full_config() {
        let config = r#"
            config_version = 1

            [service]
            data_dir = "/var/lib/parkgate"
            default_tenant = "north-lot"

            [settings]
            grace_period_minutes = 15
            baseline_hourly_rate = 40

            [settings.tariffs]
            four_wheeler = [
                { hours = 24, amount = 900 },
                { hours = 1, amount = 50 },
                { hours = 12, amount = 500 },
            ]
            heavy_vehicle = [{ hours = 6, amount = 800 }]
        "#;

        let config = parse_config(config).unwrap();
        assert_eq!(config.service.default_tenant.as_str(), "north-lot");
        assert_eq!(config.default_settings.grace_period_minutes, 15);
        assert_eq!(config.default_settings.baseline_hourly_rate, Some(40));
        assert_eq!(
            config
                .default_settings
                .tariffs
                .tiers(VehicleCategory::HeavyVehicle)
                .unwrap(),
            &[Tier::new(6, 800)]
        );
    }

    #[test]
    fn parse_minimal_config() {
        let config = parse_config("config_version = 1").unwrap();
        assert_eq!(config.service.default_tenant.as_str(), DEFAULT_TENANT);
        assert_eq!(config.default_settings.grace_period_minutes, 0);
        assert!(config.default_settings.tariffs.is_empty());
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_tariffs() {
        let config = r#"
            config_version = 1

            [settings.tariffs]
            hovercraft = [{ hours = 1, amount = 10 }]
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_version = 1\n[settings]\ngrace_period_minutes = 5\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.default_settings.grace_period_minutes, 5);

        let missing = load_config(dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(ConfigError::ReadError(_))));
    }
}
