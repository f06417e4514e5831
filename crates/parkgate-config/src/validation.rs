//! Configuration validation

use crate::schema::{RawConfig, RawSettings};
use parkgate_api::{Settings, TariffIssue, TariffTable, Tier, VehicleCategory};
use std::collections::HashMap;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Unknown vehicle category '{0}'")]
    UnknownCategory(String),

    #[error("grace_period_minutes must be a non-negative integer, got {0}")]
    InvalidGracePeriod(i64),

    #[error("baseline_hourly_rate must be non-negative, got {0}")]
    InvalidBaselineRate(i64),

    #[error("Category '{category}': {message}")]
    TierError { category: String, message: String },

    #[error(transparent)]
    Tariff(#[from] TariffIssue),

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(tenant) = &config.service.default_tenant {
        if tenant.trim().is_empty() {
            errors.push(ValidationError::GlobalError(
                "default_tenant cannot be empty".into(),
            ));
        }
    }

    errors.extend(validate_settings(&config.settings));
    errors
}

/// Validate billing settings, returning every problem found
pub fn validate_settings(raw: &RawSettings) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(grace) = raw.grace_period_minutes {
        if grace < 0 || grace > i64::from(u32::MAX) {
            errors.push(ValidationError::InvalidGracePeriod(grace));
        }
    }

    if let Some(rate) = raw.baseline_hourly_rate {
        if rate < 0 {
            errors.push(ValidationError::InvalidBaselineRate(rate));
        }
    }

    let mut seen: HashMap<VehicleCategory, &str> = HashMap::new();
    for (name, tiers) in &raw.tariffs {
        match name.parse::<VehicleCategory>() {
            Ok(category) => {
                // Spellings like `four-wheeler` and `four_wheeler` name one category
                if let Some(first) = seen.insert(category, name) {
                    errors.push(ValidationError::TierError {
                        category: name.clone(),
                        message: format!("same category as '{first}'; list its tiers once"),
                    });
                }
            }
            Err(_) => errors.push(ValidationError::UnknownCategory(name.clone())),
        }

        for tier in tiers {
            if tier.hours < 0 || tier.hours > i64::from(u32::MAX) {
                errors.push(ValidationError::TierError {
                    category: name.clone(),
                    message: format!("hours out of range: {}", tier.hours),
                });
            }
            if tier.amount < 0 {
                errors.push(ValidationError::TierError {
                    category: name.clone(),
                    message: format!("amount cannot be negative: {}", tier.amount),
                });
            }
        }
    }

    // Shape problems (zero-hour, duplicate, missing fallback) are checked on
    // the converted settings so config files and runtime updates agree.
    if errors.is_empty() {
        errors.extend(
            convert_settings(raw)
                .check()
                .into_iter()
                .map(ValidationError::from),
        );
    }

    errors
}

/// Convert raw settings into the validated form.
///
/// Assumes [`validate_settings`] reported no errors.
pub(crate) fn convert_settings(raw: &RawSettings) -> Settings {
    let mut tariffs = TariffTable::new();
    for (name, raw_tiers) in &raw.tariffs {
        let Ok(category) = name.parse::<VehicleCategory>() else {
            continue;
        };
        let tiers = raw_tiers
            .iter()
            .map(|t| Tier::new(t.hours.max(0) as u32, t.amount.max(0) as u64))
            .collect();
        tariffs.set_tiers(category, tiers);
    }

    Settings {
        grace_period_minutes: raw.grace_period_minutes.unwrap_or(0).max(0) as u32,
        baseline_hourly_rate: raw.baseline_hourly_rate.map(|r| r.max(0) as u64),
        tariffs,
    }
}
