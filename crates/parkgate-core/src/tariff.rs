//! Fee computation

use chrono::{DateTime, Utc};
use parkgate_api::{Fee, Settings, Tier, VehicleCategory};
use parkgate_util::{ceil_hours, minutes_between, ParkingError, Result};

/// Pure fee calculator over one settings snapshot
#[derive(Debug, Clone, Copy)]
pub struct TariffCalculator<'a> {
    settings: &'a Settings,
}

impl<'a> TariffCalculator<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Compute the fee for a stay from `entry_time` to `exit_time`.
    ///
    /// - Exempt stays and stays within the grace period (inclusive) are free.
    /// - Otherwise partial hours round up, and the tier with the largest
    ///   threshold not exceeding the billed hours sets a flat fee.
    /// - Below every threshold, the 1-hour tier (or the baseline rate) is
    ///   charged per hour.
    ///
    /// Exemption never changes `billed_minutes`.
    pub fn compute_fee(
        &self,
        entry_time: DateTime<Utc>,
        exit_time: DateTime<Utc>,
        category: VehicleCategory,
        is_exempt: bool,
    ) -> Result<Fee> {
        if exit_time < entry_time {
            return Err(ParkingError::InvalidInterval);
        }
        let billed_minutes = minutes_between(exit_time, entry_time).max(0) as u64;

        if is_exempt || billed_minutes <= u64::from(self.settings.grace_period_minutes) {
            return Ok(Fee {
                amount: 0,
                billed_minutes,
            });
        }

        let amount = self.tiered_amount(category, ceil_hours(billed_minutes))?;
        Ok(Fee {
            amount,
            billed_minutes,
        })
    }

    fn tiered_amount(&self, category: VehicleCategory, billed_hours: u64) -> Result<u64> {
        let tiers = match self.settings.tariffs.tiers(category) {
            Some(tiers) if !tiers.is_empty() => tiers,
            _ => return Err(ParkingError::TariffNotConfigured(category.to_string())),
        };

        let mut sorted: Vec<&Tier> = tiers.iter().collect();
        sorted.sort_by(|a, b| b.threshold_hours.cmp(&a.threshold_hours));

        if let Some(tier) = sorted
            .iter()
            .find(|t| u64::from(t.threshold_hours) <= billed_hours)
        {
            return Ok(tier.amount);
        }

        let hourly_rate = tiers
            .iter()
            .find(|t| t.threshold_hours == 1)
            .map(|t| t.amount)
            .or(self.settings.baseline_hourly_rate)
            .ok_or_else(|| ParkingError::MissingFallbackRate(category.to_string()))?;

        billed_hours
            .checked_mul(hourly_rate)
            .ok_or_else(|| ParkingError::TariffOverflow(category.to_string()))
    }
}
