//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Process-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Default billing settings for tenants without persisted ones
    #[serde(default)]
    pub settings: RawSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Tenant used when the caller does not name one
    pub default_tenant: Option<String>,
}

/// Billing settings. Integers are signed here so negative input is reported
/// by validation instead of failing inside the TOML parser.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSettings {
    /// Free stay in minutes (inclusive)
    pub grace_period_minutes: Option<i64>,

    /// Hourly rate for categories without a 1-hour tier
    pub baseline_hourly_rate: Option<i64>,

    /// Category name -> tiers, e.g. `four_wheeler = [{ hours = 1, amount = 50 }]`
    #[serde(default)]
    pub tariffs: BTreeMap<String, Vec<RawTier>>,
}

/// A single tariff tier
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawTier {
    pub hours: i64,
    pub amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tariffs() {
        let toml_str = r#"
            config_version = 1

            [settings]
            grace_period_minutes = 10

            [settings.tariffs]
            four_wheeler = [
                { hours = 1, amount = 50 },
                { hours = 12, amount = 500 },
            ]
            two_wheeler = [{ hours = 1, amount = 10 }]
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.settings.grace_period_minutes, Some(10));
        assert_eq!(config.settings.tariffs.len(), 2);
        assert_eq!(config.settings.tariffs["four_wheeler"][1].amount, 500);
    }

    #[test]
    fn service_section_is_optional() {
        let config: RawConfig = toml::from_str("config_version = 1").unwrap();
        assert!(config.service.data_dir.is_none());
        assert!(config.settings.tariffs.is_empty());
    }
}
