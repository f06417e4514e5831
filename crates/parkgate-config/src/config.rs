//! Validated configuration structures

use crate::schema::{RawConfig, RawServiceConfig};
use crate::validation::convert_settings;
use parkgate_api::Settings;
use parkgate_util::{data_dir_without_env, TenantId};
use std::path::PathBuf;

/// Tenant used when neither the config nor the caller names one
pub const DEFAULT_TENANT: &str = "default";

/// Validated configuration ready for use by the engine
#[derive(Debug, Clone)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Settings applied to tenants that have none persisted
    pub default_settings: Settings,
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            default_settings: convert_settings(&raw.settings),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub default_tenant: TenantId,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
            default_tenant: TenantId::new(
                raw.default_tenant
                    .map(|t| t.trim().to_string())
                    .unwrap_or_else(|| DEFAULT_TENANT.to_string()),
            ),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: data_dir_without_env(),
            default_tenant: TenantId::new(DEFAULT_TENANT),
        }
    }
}
