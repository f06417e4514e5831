//! Store trait definitions

use chrono::{DateTime, Utc};
use parkgate_api::{Fee, MembershipPass, ParkingSession, Settings};
use parkgate_util::{PassId, SessionId, TenantId, VehicleId};

use crate::{AuditEvent, StoreResult};

/// Settings as persisted, with the save counter they were written under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSettings {
    pub version: u64,
    pub settings: Settings,
}

/// Main store trait. Every operation is scoped to one tenant.
pub trait Store: Send + Sync {
    // Sessions

    /// Insert a new active session.
    ///
    /// Fails with [`StoreError::Conflict`](crate::StoreError::Conflict) if the
    /// vehicle already has an active session; the check and the insert are a
    /// single atomic step.
    fn insert_active_session(&self, session: &ParkingSession) -> StoreResult<()>;

    /// Transition an active session to completed, setting the result fields.
    ///
    /// Returns `None` when no *active* session with this id exists; in that
    /// case nothing is written.
    fn complete_session(
        &self,
        tenant: &TenantId,
        id: &SessionId,
        exit_time: DateTime<Utc>,
        fee: Fee,
    ) -> StoreResult<Option<ParkingSession>>;

    /// Get a session in any state
    fn get_session(&self, tenant: &TenantId, id: &SessionId) -> StoreResult<Option<ParkingSession>>;

    /// Get the active session for a vehicle, if any
    fn find_active_session(
        &self,
        tenant: &TenantId,
        vehicle: &VehicleId,
    ) -> StoreResult<Option<ParkingSession>>;

    /// All active sessions, oldest entry first
    fn list_active_sessions(&self, tenant: &TenantId) -> StoreResult<Vec<ParkingSession>>;

    /// Most recent sessions by entry time, newest first
    fn list_recent_sessions(&self, tenant: &TenantId, limit: usize)
        -> StoreResult<Vec<ParkingSession>>;

    /// Completed sessions whose exit time falls in `[start, end)`
    fn list_completed_between(
        &self,
        tenant: &TenantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<ParkingSession>>;

    // Membership passes

    fn insert_pass(&self, pass: &MembershipPass) -> StoreResult<()>;

    fn get_pass(&self, tenant: &TenantId, id: &PassId) -> StoreResult<Option<MembershipPass>>;

    /// Pass for a vehicle. If several exist, the one expiring last wins.
    fn find_pass_by_vehicle(
        &self,
        tenant: &TenantId,
        vehicle: &VehicleId,
    ) -> StoreResult<Option<MembershipPass>>;

    fn list_passes(&self, tenant: &TenantId) -> StoreResult<Vec<MembershipPass>>;

    /// Set a pass's expiry. Returns false if the pass does not exist.
    fn update_pass_expiry(
        &self,
        tenant: &TenantId,
        id: &PassId,
        expiry: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Returns false if the pass does not exist.
    fn delete_pass(&self, tenant: &TenantId, id: &PassId) -> StoreResult<bool>;

    // Settings

    /// Load persisted settings; `None` if the tenant never saved any
    fn load_settings(&self, tenant: &TenantId) -> StoreResult<Option<StoredSettings>>;

    /// Number of times the tenant's settings were saved; 0 if never
    fn settings_version(&self, tenant: &TenantId) -> StoreResult<u64>;

    /// Replace the tenant's settings, returning the new version
    fn save_settings(&self, tenant: &TenantId, settings: &Settings) -> StoreResult<u64>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events for a tenant, newest first
    fn get_recent_audits(&self, tenant: &TenantId, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
