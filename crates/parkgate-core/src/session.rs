//! Session lifecycle: Active -> Completed, one active session per vehicle

use chrono::{DateTime, NaiveDate, Utc};
use parkgate_api::{
    ExemptionReason, Fee, ParkingSession, ProofRef, SessionRef, SessionStatus, VehicleCategory,
};
use parkgate_store::{Store, StoreError};
use parkgate_util::{day_bounds, ParkingError, Result, SessionId, TenantId, VehicleId};
use tracing::debug;

/// Sessions of one tenant
pub struct SessionStore<'a> {
    store: &'a dyn Store,
    tenant: &'a TenantId,
}

impl<'a> SessionStore<'a> {
    pub fn new(store: &'a dyn Store, tenant: &'a TenantId) -> Self {
        Self { store, tenant }
    }

    /// Open an active session entering at `now`.
    ///
    /// Fails with `DuplicateActiveSession` if the vehicle is already parked,
    /// including when a concurrent writer wins the race to insert.
    pub fn open(
        &self,
        vehicle: VehicleId,
        category: VehicleCategory,
        exemption: ExemptionReason,
        proof: Option<ProofRef>,
        now: DateTime<Utc>,
    ) -> Result<ParkingSession> {
        if self.store.find_active_session(self.tenant, &vehicle)?.is_some() {
            return Err(ParkingError::DuplicateActiveSession(vehicle));
        }

        let session = ParkingSession::start(
            self.tenant.clone(),
            vehicle,
            category,
            exemption,
            proof,
            now,
        );

        match self.store.insert_active_session(&session) {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(ParkingError::DuplicateActiveSession(session.vehicle_id));
            }
            Err(e) => return Err(e.into()),
        }

        debug!(session_id = %session.id, vehicle_id = %session.vehicle_id, "Session opened");
        Ok(session)
    }

    /// Complete the active session named by `target`.
    ///
    /// The result fields are written exactly once; a second close of the same
    /// session fails with `AlreadyCompleted` and leaves the record untouched.
    pub fn close(
        &self,
        target: &SessionRef,
        exit_time: DateTime<Utc>,
        fee: Fee,
    ) -> Result<ParkingSession> {
        let session = match target {
            SessionRef::Id(id) => match self.store.get_session(self.tenant, id)? {
                Some(s) if s.status == SessionStatus::Completed => {
                    return Err(ParkingError::AlreadyCompleted);
                }
                Some(s) => s,
                None => return Err(ParkingError::NoActiveSession),
            },
            SessionRef::Vehicle(vehicle) => self
                .store
                .find_active_session(self.tenant, vehicle)?
                .ok_or(ParkingError::NoActiveSession)?,
        };

        if exit_time < session.entry_time {
            return Err(ParkingError::InvalidInterval);
        }

        match self
            .store
            .complete_session(self.tenant, &session.id, exit_time, fee)?
        {
            Some(closed) => {
                debug!(session_id = %closed.id, amount = fee.amount, "Session closed");
                Ok(closed)
            }
            // Lost a race with another close of the same session
            None => match self.store.get_session(self.tenant, &session.id)? {
                Some(s) if s.status == SessionStatus::Completed => {
                    Err(ParkingError::AlreadyCompleted)
                }
                _ => Err(ParkingError::NoActiveSession),
            },
        }
    }

    /// Active session named by `target`, if any. Never mutates.
    pub fn find_active(&self, target: &SessionRef) -> Result<Option<ParkingSession>> {
        match target {
            SessionRef::Id(id) => Ok(self
                .store
                .get_session(self.tenant, id)?
                .filter(ParkingSession::is_active)),
            SessionRef::Vehicle(vehicle) => {
                Ok(self.store.find_active_session(self.tenant, vehicle)?)
            }
        }
    }

    /// Session in any state
    pub fn get(&self, id: &SessionId) -> Result<Option<ParkingSession>> {
        Ok(self.store.get_session(self.tenant, id)?)
    }

    pub fn list_active(&self) -> Result<Vec<ParkingSession>> {
        Ok(self.store.list_active_sessions(self.tenant)?)
    }

    pub fn list_recent(&self, limit: usize) -> Result<Vec<ParkingSession>> {
        Ok(self.store.list_recent_sessions(self.tenant, limit)?)
    }

    /// Sessions completed during a UTC calendar day
    pub fn completed_on(&self, day: NaiveDate) -> Result<Vec<ParkingSession>> {
        let (start, end) = day_bounds(day);
        Ok(self.store.list_completed_between(self.tenant, start, end)?)
    }
}
