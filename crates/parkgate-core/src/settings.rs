//! Versioned billing settings per tenant

use parkgate_api::Settings;
use parkgate_store::{Store, StoredSettings};
use parkgate_util::{ParkingError, Result, TenantId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Immutable view of a tenant's settings. A computation takes one snapshot
/// and uses nothing else, so an update can never land mid-calculation.
///
/// Version 1 is the configured defaults; every save to the store adds one.
#[derive(Debug, Clone)]
pub struct SettingsSnapshot {
    pub version: u64,
    pub settings: Arc<Settings>,
}

impl SettingsSnapshot {
    fn from_stored(stored: StoredSettings) -> Self {
        Self {
            version: stored.version + 1,
            settings: Arc::new(stored.settings),
        }
    }
}

/// Cache of per-tenant snapshots with a single writer path.
///
/// The store's save counter is checked on every snapshot, so updates made
/// by another engine on the same database are picked up before the next
/// computation.
pub struct SettingsRegistry {
    defaults: Settings,
    snapshots: Mutex<HashMap<TenantId, SettingsSnapshot>>,
}

impl SettingsRegistry {
    /// `defaults` apply to tenants that never persisted their own settings
    pub fn new(defaults: Settings) -> Self {
        Self {
            defaults,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Current snapshot for a tenant, reloading it when the store has moved on
    pub fn snapshot(&self, store: &dyn Store, tenant: &TenantId) -> Result<SettingsSnapshot> {
        let current = store.settings_version(tenant)? + 1;

        let mut snapshots = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(snapshot) = snapshots.get(tenant) {
            if snapshot.version == current {
                return Ok(snapshot.clone());
            }
        }

        let snapshot = match store.load_settings(tenant)? {
            Some(stored) => SettingsSnapshot::from_stored(stored),
            None => {
                debug!(tenant = %tenant, "No stored settings, using configured defaults");
                SettingsSnapshot {
                    version: 1,
                    settings: Arc::new(self.defaults.clone()),
                }
            }
        };

        debug!(tenant = %tenant, version = snapshot.version, "Settings loaded");
        snapshots.insert(tenant.clone(), snapshot.clone());
        Ok(snapshot)
    }

    /// Validate, persist and publish new settings for a tenant.
    ///
    /// The cache entry is replaced only after the store write succeeds.
    pub fn update(
        &self,
        store: &dyn Store,
        tenant: &TenantId,
        settings: Settings,
    ) -> Result<SettingsSnapshot> {
        let issues = settings.check();
        if !issues.is_empty() {
            let message = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ParkingError::validation(message));
        }

        let mut snapshots = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = store.save_settings(tenant, &settings)?;

        let snapshot = SettingsSnapshot::from_stored(StoredSettings {
            version: saved,
            settings,
        });
        snapshots.insert(tenant.clone(), snapshot.clone());

        info!(tenant = %tenant, version = snapshot.version, "Settings updated");
        Ok(snapshot)
    }
}
