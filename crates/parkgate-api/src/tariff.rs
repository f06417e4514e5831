//! Tariff tables and per-tenant settings

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::VehicleCategory;

/// Flat fee charged once a stay reaches `threshold_hours`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub threshold_hours: u32,
    pub amount: u64,
}

impl Tier {
    pub fn new(threshold_hours: u32, amount: u64) -> Self {
        Self {
            threshold_hours,
            amount,
        }
    }
}

/// Tiers per vehicle category. Tiers are kept in insertion order; the
/// calculator sorts them itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TariffTable(BTreeMap<VehicleCategory, Vec<Tier>>);

impl TariffTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper used by config conversion and tests
    pub fn with_tiers(mut self, category: VehicleCategory, tiers: Vec<Tier>) -> Self {
        self.0.insert(category, tiers);
        self
    }

    pub fn tiers(&self, category: VehicleCategory) -> Option<&[Tier]> {
        self.0.get(&category).map(Vec::as_slice)
    }

    pub fn set_tiers(&mut self, category: VehicleCategory, tiers: Vec<Tier>) {
        self.0.insert(category, tiers);
    }

    /// Insert or replace the tier with the same threshold
    pub fn upsert_tier(&mut self, category: VehicleCategory, tier: Tier) {
        let tiers = self.0.entry(category).or_default();
        match tiers
            .iter_mut()
            .find(|t| t.threshold_hours == tier.threshold_hours)
        {
            Some(existing) => existing.amount = tier.amount,
            None => tiers.push(tier),
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = VehicleCategory> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VehicleCategory, &[Tier])> {
        self.0.iter().map(|(c, t)| (*c, t.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Problems that make a tariff table unusable for billing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TariffIssue {
    #[error("category '{0}' has no tiers")]
    EmptyTiers(VehicleCategory),

    #[error("category '{0}' has a tier with a zero-hour threshold")]
    ZeroHourTier(VehicleCategory),

    #[error("category '{category}' lists the {hours}h threshold more than once")]
    DuplicateThreshold {
        category: VehicleCategory,
        hours: u32,
    },

    #[error("category '{0}' has no 1-hour tier and no baseline hourly rate is configured")]
    NoFallbackRate(VehicleCategory),
}

/// Per-tenant billing settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Stays up to and including this many minutes are free
    pub grace_period_minutes: u32,

    /// Hourly rate used when a category has no 1-hour tier
    #[serde(default)]
    pub baseline_hourly_rate: Option<u64>,

    #[serde(default)]
    pub tariffs: TariffTable,
}

impl Settings {
    /// Check the tariff table for configurations the calculator would refuse
    pub fn check(&self) -> Vec<TariffIssue> {
        let mut issues = Vec::new();

        for (category, tiers) in self.tariffs.iter() {
            if tiers.is_empty() {
                issues.push(TariffIssue::EmptyTiers(category));
                continue;
            }

            let mut seen = BTreeSet::new();
            for tier in tiers {
                if tier.threshold_hours == 0 {
                    issues.push(TariffIssue::ZeroHourTier(category));
                } else if !seen.insert(tier.threshold_hours) {
                    issues.push(TariffIssue::DuplicateThreshold {
                        category,
                        hours: tier.threshold_hours,
                    });
                }
            }

            let has_hourly = tiers.iter().any(|t| t.threshold_hours == 1);
            if !has_hourly && self.baseline_hourly_rate.is_none() {
                issues.push(TariffIssue::NoFallbackRate(category));
            }
        }

        issues
    }
}
