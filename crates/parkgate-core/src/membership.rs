//! Membership passes

use chrono::{DateTime, Utc};
use parkgate_api::{MembershipPass, VehicleCategory};
use parkgate_store::Store;
use parkgate_util::{add_calendar_month, ParkingError, PassId, Result, TenantId, VehicleId};
use tracing::debug;

/// Expiry after renewing at `now`.
///
/// An unexpired pass extends from its current expiry; an expired one starts
/// fresh from `now`. The result is always strictly after both.
pub fn renewal_expiry(current_expiry: DateTime<Utc>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let base = current_expiry.max(now);
    add_calendar_month(base)
        .ok_or_else(|| ParkingError::validation(format!("cannot extend expiry past {base}")))
}

/// Passes of one tenant
pub struct MembershipRegistry<'a> {
    store: &'a dyn Store,
    tenant: &'a TenantId,
}

impl<'a> MembershipRegistry<'a> {
    pub fn new(store: &'a dyn Store, tenant: &'a TenantId) -> Self {
        Self { store, tenant }
    }

    pub fn find_pass(&self, vehicle: &VehicleId) -> Result<Option<MembershipPass>> {
        Ok(self.store.find_pass_by_vehicle(self.tenant, vehicle)?)
    }

    pub fn is_valid_at(pass: &MembershipPass, timestamp: DateTime<Utc>) -> bool {
        pass.is_valid_at(timestamp)
    }

    pub fn get(&self, id: &PassId) -> Result<MembershipPass> {
        self.store
            .get_pass(self.tenant, id)?
            .ok_or(ParkingError::PassNotFound(*id))
    }

    pub fn list(&self) -> Result<Vec<MembershipPass>> {
        Ok(self.store.list_passes(self.tenant)?)
    }

    /// Register a new pass. A vehicle may hold only one.
    pub fn issue(
        &self,
        vehicle: VehicleId,
        category: VehicleCategory,
        holder_name: &str,
        expiry_date: DateTime<Utc>,
    ) -> Result<MembershipPass> {
        let holder_name = holder_name.trim();
        if holder_name.is_empty() {
            return Err(ParkingError::validation("holder name cannot be empty"));
        }
        if self.find_pass(&vehicle)?.is_some() {
            return Err(ParkingError::DuplicatePass(vehicle));
        }

        let pass = MembershipPass {
            id: PassId::new(),
            tenant_id: self.tenant.clone(),
            vehicle_id: vehicle,
            category,
            holder_name: holder_name.to_string(),
            expiry_date,
        };
        self.store.insert_pass(&pass)?;

        debug!(pass_id = %pass.id, vehicle_id = %pass.vehicle_id, "Pass issued");
        Ok(pass)
    }

    /// Extend a pass by one calendar month, returning the updated pass
    pub fn renew(&self, id: &PassId, now: DateTime<Utc>) -> Result<MembershipPass> {
        let mut pass = self.get(id)?;
        let new_expiry = renewal_expiry(pass.expiry_date, now)?;

        if !self.store.update_pass_expiry(self.tenant, id, new_expiry)? {
            return Err(ParkingError::PassNotFound(*id));
        }

        debug!(
            pass_id = %id,
            previous_expiry = %pass.expiry_date,
            new_expiry = %new_expiry,
            "Pass renewed"
        );
        pass.expiry_date = new_expiry;
        Ok(pass)
    }

    pub fn revoke(&self, id: &PassId) -> Result<()> {
        if !self.store.delete_pass(self.tenant, id)? {
            return Err(ParkingError::PassNotFound(*id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use parkgate_store::SqliteStore;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn plate() -> VehicleId {
        VehicleId::parse("MH12AB1234").unwrap()
    }

    #[test]
    fn test_renewal_extends_unexpired_pass_from_expiry() {
        let expiry = at("2025-05-20T00:00:00Z");
        let now = at("2025-05-01T10:00:00Z");
        assert_eq!(renewal_expiry(expiry, now).unwrap(), at("2025-06-20T00:00:00Z"));
    }

    #[test]
    fn test_renewal_of_expired_pass_starts_now() {
        let expiry = at("2025-01-10T00:00:00Z");
        let now = at("2025-05-01T10:00:00Z");
        assert_eq!(renewal_expiry(expiry, now).unwrap(), at("2025-06-01T10:00:00Z"));
    }

    #[test]
    fn test_renewal_is_strictly_monotonic() {
        let now = at("2025-01-31T12:00:00Z");
        for offset_days in -40..40 {
            let expiry = now + Duration::days(offset_days);
            let renewed = renewal_expiry(expiry, now).unwrap();
            assert!(renewed > expiry.max(now));
        }
    }

    #[test]
    fn test_issue_and_find() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::new("lot");
        let registry = MembershipRegistry::new(&store, &tenant);

        let pass = registry
            .issue(plate(), VehicleCategory::FourWheeler, " S. Rao ", at("2025-06-01T00:00:00Z"))
            .unwrap();
        assert_eq!(pass.holder_name, "S. Rao");

        let found = registry.find_pass(&plate()).unwrap().unwrap();
        assert_eq!(found, pass);
        assert!(MembershipRegistry::is_valid_at(&found, at("2025-05-31T23:59:59Z")));
        assert!(!MembershipRegistry::is_valid_at(&found, at("2025-06-01T00:00:00Z")));
    }

    #[test]
    fn test_issue_rejects_duplicates_and_blank_holder() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::new("lot");
        let registry = MembershipRegistry::new(&store, &tenant);
        let expiry = at("2025-06-01T00:00:00Z");

        registry
            .issue(plate(), VehicleCategory::FourWheeler, "S. Rao", expiry)
            .unwrap();
        assert!(matches!(
            registry.issue(plate(), VehicleCategory::FourWheeler, "Other", expiry),
            Err(ParkingError::DuplicatePass(_))
        ));
        assert!(matches!(
            registry.issue(
                VehicleId::parse("KA01HH1234").unwrap(),
                VehicleCategory::TwoWheeler,
                "   ",
                expiry
            ),
            Err(ParkingError::ValidationError(_))
        ));
    }

    #[test]
    fn test_renew_persists() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::new("lot");
        let registry = MembershipRegistry::new(&store, &tenant);
        let pass = registry
            .issue(plate(), VehicleCategory::FourWheeler, "S. Rao", at("2025-06-01T00:00:00Z"))
            .unwrap();

        let renewed = registry.renew(&pass.id, at("2025-05-15T00:00:00Z")).unwrap();
        assert_eq!(renewed.expiry_date, at("2025-07-01T00:00:00Z"));
        assert_eq!(registry.get(&pass.id).unwrap().expiry_date, renewed.expiry_date);
    }

    #[test]
    fn test_unknown_pass() {
        let store = SqliteStore::in_memory().unwrap();
        let tenant = TenantId::new("lot");
        let registry = MembershipRegistry::new(&store, &tenant);
        let id = PassId::new();

        assert!(matches!(
            registry.renew(&id, at("2025-05-15T00:00:00Z")),
            Err(ParkingError::PassNotFound(_))
        ));
        assert!(matches!(registry.revoke(&id), Err(ParkingError::PassNotFound(_))));
    }

    #[test]
    fn test_passes_are_tenant_scoped() {
        let store = SqliteStore::in_memory().unwrap();
        let north = TenantId::new("north");
        let south = TenantId::new("south");
        let pass = MembershipRegistry::new(&store, &north)
            .issue(plate(), VehicleCategory::FourWheeler, "S. Rao", at("2025-06-01T00:00:00Z"))
            .unwrap();

        let south_registry = MembershipRegistry::new(&store, &south);
        assert!(south_registry.find_pass(&plate()).unwrap().is_none());
        assert!(matches!(
            south_registry.get(&pass.id),
            Err(ParkingError::PassNotFound(_))
        ));
    }
}
