//! Core policy engine: entry admission and exit settlement

use chrono::{DateTime, NaiveDate, Utc};
use parkgate_api::{
    DailySummary, ExemptionReason, Fee, MembershipPass, ParkingSession, ProofRef,
    RejectionReason, SessionRef, Settings, VehicleCategory,
};
use parkgate_store::{AuditEvent, AuditEventType, Store};
use parkgate_util::{ParkingError, PassId, Result, SessionId, TenantId, VehicleId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::{MembershipRegistry, SessionStore, SettingsRegistry, SettingsSnapshot, TariffCalculator};

/// A vehicle presenting itself at the entry gate
#[derive(Debug, Clone)]
pub struct EntryRequest {
    pub vehicle_id: VehicleId,
    pub category: VehicleCategory,
    /// Operator's exemption toggle; a valid membership overrides it
    pub exempt_requested: bool,
    /// Exemption proof captured at the gate, recorded only for operator exemptions
    pub proof: Option<ProofRef>,
}

/// Admission decision from the core engine
#[derive(Debug)]
pub enum AdmissionDecision {
    Admitted(ParkingSession),
    Rejected { reason: RejectionReason },
}

/// Settlement decision from the core engine
#[derive(Debug)]
pub enum SettlementDecision {
    /// The session was completed now; this is the receipt
    Settled(ParkingSession),
    NoActiveSession,
    /// The named session was settled earlier; the original receipt is returned
    AlreadyCompleted(ParkingSession),
}

/// What settlement would charge right now
#[derive(Debug, Clone)]
pub struct Quote {
    pub session: ParkingSession,
    pub fee: Fee,
    pub settings_version: u64,
}

/// The core policy engine
pub struct PolicyEngine {
    store: Arc<dyn Store>,
    settings: SettingsRegistry,
    tenant_locks: Mutex<HashMap<TenantId, Arc<Mutex<()>>>>,
}

impl PolicyEngine {
    /// Create a new engine. `default_settings` apply to tenants without
    /// persisted settings.
    pub fn new(store: Arc<dyn Store>, default_settings: Settings) -> Self {
        info!(
            categories = default_settings.tariffs.categories().count(),
            grace_period_minutes = default_settings.grace_period_minutes,
            "Policy engine initialized"
        );

        Self {
            store,
            settings: SettingsRegistry::new(default_settings),
            tenant_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Admission and settlement for one tenant run one at a time
    fn tenant_lock(&self, tenant: &TenantId) -> Arc<Mutex<()>> {
        let mut locks = self.tenant_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(tenant.clone()).or_default().clone()
    }

    fn audit(&self, tenant: &TenantId, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(tenant.clone(), event)) {
            warn!(tenant = %tenant, error = %e, "Failed to append audit event");
        }
    }

    fn sessions<'a>(&'a self, tenant: &'a TenantId) -> SessionStore<'a> {
        SessionStore::new(self.store.as_ref(), tenant)
    }

    fn passes<'a>(&'a self, tenant: &'a TenantId) -> MembershipRegistry<'a> {
        MembershipRegistry::new(self.store.as_ref(), tenant)
    }

    /// Decide whether a vehicle may enter, opening a session if so.
    ///
    /// 1. A vehicle already parked is rejected.
    /// 2. A vehicle with a pass is rejected if the pass has expired, and
    ///    otherwise admitted exempt regardless of the operator's toggle.
    /// 3. Anyone else is admitted with the operator's exemption choice.
    pub fn request_entry(
        &self,
        tenant: &TenantId,
        request: EntryRequest,
        now: DateTime<Utc>,
    ) -> Result<AdmissionDecision> {
        let lock = self.tenant_lock(tenant);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let sessions = self.sessions(tenant);
        let vehicle = request.vehicle_id;
        let by_vehicle = SessionRef::Vehicle(vehicle.clone());

        if let Some(active) = sessions.find_active(&by_vehicle)? {
            return Ok(self.reject(
                tenant,
                vehicle,
                RejectionReason::DuplicateActiveSession {
                    session_id: active.id,
                },
            ));
        }

        let (exemption, proof) = match self.passes(tenant).find_pass(&vehicle)? {
            Some(pass) if !pass.is_valid_at(now) => {
                return Ok(self.reject(
                    tenant,
                    vehicle,
                    RejectionReason::MembershipExpired {
                        pass_id: pass.id,
                        expired_at: pass.expiry_date,
                    },
                ));
            }
            Some(pass) => {
                debug!(pass_id = %pass.id, vehicle_id = %vehicle, "Valid membership, entry exempt");
                (ExemptionReason::Membership, None)
            }
            None if request.exempt_requested => (ExemptionReason::OperatorGranted, request.proof),
            None => {
                if request.proof.is_some() {
                    debug!(vehicle_id = %vehicle, "Ignoring proof for non-exempt entry");
                }
                (ExemptionReason::None, None)
            }
        };

        let session = match sessions.open(vehicle, request.category, exemption, proof, now) {
            Ok(session) => session,
            // Another writer on the same store admitted the vehicle first
            Err(ParkingError::DuplicateActiveSession(vehicle)) => {
                return match sessions.find_active(&SessionRef::Vehicle(vehicle.clone()))? {
                    Some(active) => Ok(self.reject(
                        tenant,
                        vehicle,
                        RejectionReason::DuplicateActiveSession {
                            session_id: active.id,
                        },
                    )),
                    None => Err(ParkingError::DuplicateActiveSession(vehicle)),
                };
            }
            Err(e) => return Err(e),
        };

        self.audit(
            tenant,
            AuditEventType::EntryAdmitted {
                session_id: session.id,
                vehicle_id: session.vehicle_id.clone(),
                category: session.category,
                exempt: session.is_exempt(),
            },
        );

        info!(
            tenant = %tenant,
            session_id = %session.id,
            vehicle_id = %session.vehicle_id,
            category = %session.category,
            exemption = session.exemption.as_str(),
            "Entry admitted"
        );

        Ok(AdmissionDecision::Admitted(session))
    }

    fn reject(
        &self,
        tenant: &TenantId,
        vehicle: VehicleId,
        reason: RejectionReason,
    ) -> AdmissionDecision {
        info!(tenant = %tenant, vehicle_id = %vehicle, reason = %reason, "Entry rejected");

        self.audit(
            tenant,
            AuditEventType::EntryRejected {
                vehicle_id: vehicle,
                reason: reason.clone(),
            },
        );

        AdmissionDecision::Rejected { reason }
    }

    /// Settle the active session named by `target`, charging up to `now`.
    pub fn settle_exit(
        &self,
        tenant: &TenantId,
        target: &SessionRef,
        now: DateTime<Utc>,
    ) -> Result<SettlementDecision> {
        let lock = self.tenant_lock(tenant);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let sessions = self.sessions(tenant);
        let session = match sessions.find_active(target)? {
            Some(session) => session,
            None => return self.unsettled(&sessions, target),
        };

        let snapshot = self.settings.snapshot(self.store.as_ref(), tenant)?;
        let fee = TariffCalculator::new(&snapshot.settings).compute_fee(
            session.entry_time,
            now,
            session.category,
            session.is_exempt(),
        )?;

        let by_id = SessionRef::Id(session.id);
        let closed = match sessions.close(&by_id, now, fee) {
            Ok(closed) => closed,
            Err(ParkingError::AlreadyCompleted | ParkingError::NoActiveSession) => {
                return self.unsettled(&sessions, &by_id);
            }
            Err(e) => return Err(e),
        };

        self.audit(
            tenant,
            AuditEventType::ExitSettled {
                session_id: closed.id,
                vehicle_id: closed.vehicle_id.clone(),
                amount: fee.amount,
                billed_minutes: fee.billed_minutes,
            },
        );

        info!(
            tenant = %tenant,
            session_id = %closed.id,
            vehicle_id = %closed.vehicle_id,
            amount = fee.amount,
            billed_minutes = fee.billed_minutes,
            settings_version = snapshot.version,
            "Exit settled"
        );

        Ok(SettlementDecision::Settled(closed))
    }

    fn unsettled(&self, sessions: &SessionStore<'_>, target: &SessionRef) -> Result<SettlementDecision> {
        if let SessionRef::Id(id) = target {
            if let Some(session) = sessions.get(id)? {
                if !session.is_active() {
                    debug!(session_id = %id, "Settlement requested for completed session");
                    return Ok(SettlementDecision::AlreadyCompleted(session));
                }
            }
        }
        debug!(session = %target, "No active session to settle");
        Ok(SettlementDecision::NoActiveSession)
    }

    /// Fee the active session would be charged at `now`, without settling it
    pub fn quote(
        &self,
        tenant: &TenantId,
        target: &SessionRef,
        now: DateTime<Utc>,
    ) -> Result<Option<Quote>> {
        let Some(session) = self.sessions(tenant).find_active(target)? else {
            return Ok(None);
        };

        let snapshot = self.settings.snapshot(self.store.as_ref(), tenant)?;
        let fee = TariffCalculator::new(&snapshot.settings).compute_fee(
            session.entry_time,
            now,
            session.category,
            session.is_exempt(),
        )?;

        Ok(Some(Quote {
            session,
            fee,
            settings_version: snapshot.version,
        }))
    }

    // Membership passes

    /// Issue a pass; a vehicle may hold only one per tenant
    pub fn issue_pass(
        &self,
        tenant: &TenantId,
        vehicle: VehicleId,
        category: VehicleCategory,
        holder_name: &str,
        expiry_date: DateTime<Utc>,
    ) -> Result<MembershipPass> {
        let lock = self.tenant_lock(tenant);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let pass = self
            .passes(tenant)
            .issue(vehicle, category, holder_name, expiry_date)?;

        self.audit(
            tenant,
            AuditEventType::PassIssued {
                pass_id: pass.id,
                vehicle_id: pass.vehicle_id.clone(),
                expiry_date: pass.expiry_date,
            },
        );
        info!(tenant = %tenant, pass_id = %pass.id, vehicle_id = %pass.vehicle_id, "Pass issued");

        Ok(pass)
    }

    /// Extend a pass by one calendar month from `max(expiry, now)`
    pub fn renew_pass(
        &self,
        tenant: &TenantId,
        pass_id: &PassId,
        now: DateTime<Utc>,
    ) -> Result<MembershipPass> {
        let lock = self.tenant_lock(tenant);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let passes = self.passes(tenant);
        let previous_expiry = passes.get(pass_id)?.expiry_date;
        let renewed = passes.renew(pass_id, now)?;

        self.audit(
            tenant,
            AuditEventType::PassRenewed {
                pass_id: *pass_id,
                previous_expiry,
                new_expiry: renewed.expiry_date,
            },
        );
        info!(
            tenant = %tenant,
            pass_id = %pass_id,
            new_expiry = %renewed.expiry_date,
            "Pass renewed"
        );

        Ok(renewed)
    }

    pub fn revoke_pass(&self, tenant: &TenantId, pass_id: &PassId) -> Result<()> {
        let lock = self.tenant_lock(tenant);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.passes(tenant).revoke(pass_id)?;
        self.audit(tenant, AuditEventType::PassRevoked { pass_id: *pass_id });
        info!(tenant = %tenant, pass_id = %pass_id, "Pass revoked");
        Ok(())
    }

    pub fn list_passes(&self, tenant: &TenantId) -> Result<Vec<MembershipPass>> {
        self.passes(tenant).list()
    }

    // Settings

    pub fn settings(&self, tenant: &TenantId) -> Result<SettingsSnapshot> {
        self.settings.snapshot(self.store.as_ref(), tenant)
    }

    /// Replace a tenant's settings; later computations see the new values
    pub fn update_settings(&self, tenant: &TenantId, settings: Settings) -> Result<SettingsSnapshot> {
        let snapshot = self.settings.update(self.store.as_ref(), tenant, settings)?;
        self.audit(
            tenant,
            AuditEventType::SettingsUpdated {
                version: snapshot.version,
            },
        );
        Ok(snapshot)
    }

    // Reads

    pub fn session(&self, tenant: &TenantId, id: &SessionId) -> Result<Option<ParkingSession>> {
        self.sessions(tenant).get(id)
    }

    pub fn active_sessions(&self, tenant: &TenantId) -> Result<Vec<ParkingSession>> {
        self.sessions(tenant).list_active()
    }

    pub fn recent_sessions(&self, tenant: &TenantId, limit: usize) -> Result<Vec<ParkingSession>> {
        self.sessions(tenant).list_recent(limit)
    }

    /// Totals over sessions completed on a UTC day
    pub fn daily_summary(&self, tenant: &TenantId, day: NaiveDate) -> Result<DailySummary> {
        let completed = self.sessions(tenant).completed_on(day)?;

        let mut summary = DailySummary {
            day,
            completed: 0,
            exempt: 0,
            revenue: 0,
            billed_minutes: 0,
        };
        for session in &completed {
            summary.completed += 1;
            if session.is_exempt() {
                summary.exempt += 1;
            }
            summary.revenue += session.amount.unwrap_or(0);
            summary.billed_minutes += session.billed_minutes.unwrap_or(0);
        }

        Ok(summary)
    }

    pub fn recent_audits(&self, tenant: &TenantId, limit: usize) -> Result<Vec<AuditEvent>> {
        Ok(self.store.get_recent_audits(tenant, limit)?)
    }

    pub fn is_healthy(&self) -> bool {
        self.store.is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use parkgate_api::{TariffTable, Tier};
    use parkgate_store::SqliteStore;
    use std::thread;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn plate(s: &str) -> VehicleId {
        VehicleId::parse(s).unwrap()
    }

    fn make_settings() -> Settings {
        Settings {
            grace_period_minutes: 10,
            baseline_hourly_rate: None,
            tariffs: TariffTable::new()
                .with_tiers(
                    VehicleCategory::FourWheeler,
                    vec![Tier::new(1, 50), Tier::new(12, 500), Tier::new(24, 900)],
                )
                .with_tiers(VehicleCategory::TwoWheeler, vec![Tier::new(1, 20)]),
        }
    }

    fn make_engine() -> PolicyEngine {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        PolicyEngine::new(store, make_settings())
    }

    fn car(vehicle: &str) -> EntryRequest {
        EntryRequest {
            vehicle_id: plate(vehicle),
            category: VehicleCategory::FourWheeler,
            exempt_requested: false,
            proof: None,
        }
    }

    fn admitted(decision: AdmissionDecision) -> ParkingSession {
        match decision {
            AdmissionDecision::Admitted(session) => session,
            other => panic!("expected admission, got {other:?}"),
        }
    }

    fn settled(decision: SettlementDecision) -> ParkingSession {
        match decision {
            SettlementDecision::Settled(session) => session,
            other => panic!("expected settlement, got {other:?}"),
        }
    }

    #[test]
    fn test_entry_then_exit_charges_tier() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let entry = at("2025-04-01T08:00:00Z");

        let session = admitted(engine.request_entry(&tenant, car("MH12AB1234"), entry).unwrap());
        assert_eq!(session.exemption, ExemptionReason::None);

        let closed = settled(
            engine
                .settle_exit(
                    &tenant,
                    &SessionRef::Vehicle(plate("MH12AB1234")),
                    entry + Duration::minutes(90),
                )
                .unwrap(),
        );
        assert_eq!(closed.id, session.id);
        assert_eq!(closed.amount, Some(50));
        assert_eq!(closed.billed_minutes, Some(90));
    }

    #[test]
    fn test_duplicate_entry_rejected_with_session() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let now = at("2025-04-01T08:00:00Z");

        let first = admitted(engine.request_entry(&tenant, car("KA01"), now).unwrap());
        let second = engine.request_entry(&tenant, car("ka-01"), now).unwrap();

        match second {
            AdmissionDecision::Rejected {
                reason: RejectionReason::DuplicateActiveSession { session_id },
            } => assert_eq!(session_id, first.id),
            other => panic!("expected duplicate rejection, got {other:?}"),
        }
        assert_eq!(engine.active_sessions(&tenant).unwrap().len(), 1);
    }

    #[test]
    fn test_tenants_are_isolated() {
        let engine = make_engine();
        let now = at("2025-04-01T08:00:00Z");

        admitted(engine.request_entry(&TenantId::new("a"), car("KA01"), now).unwrap());
        admitted(engine.request_entry(&TenantId::new("b"), car("KA01"), now).unwrap());
    }

    #[test]
    fn test_valid_membership_overrides_toggle() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let now = at("2025-04-01T08:00:00Z");

        engine
            .issue_pass(
                &tenant,
                plate("KA01"),
                VehicleCategory::FourWheeler,
                "Asha",
                now + Duration::days(30),
            )
            .unwrap();

        let mut request = car("KA01");
        request.proof = Some(ProofRef::new("photo-1"));
        let session = admitted(engine.request_entry(&tenant, request, now).unwrap());
        assert_eq!(session.exemption, ExemptionReason::Membership);
        assert!(session.proof_ref.is_none());

        let closed = settled(
            engine
                .settle_exit(&tenant, &SessionRef::Id(session.id), now + Duration::hours(5))
                .unwrap(),
        );
        assert_eq!(closed.amount, Some(0));
        assert_eq!(closed.billed_minutes, Some(300));
    }

    #[test]
    fn test_expired_membership_rejected_even_with_toggle() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let now = at("2025-04-01T08:00:00Z");

        let pass = engine
            .issue_pass(&tenant, plate("KA01"), VehicleCategory::FourWheeler, "Asha", now)
            .unwrap();

        let mut request = car("KA01");
        request.exempt_requested = true;
        match engine.request_entry(&tenant, request, now).unwrap() {
            AdmissionDecision::Rejected {
                reason: RejectionReason::MembershipExpired { pass_id, expired_at },
            } => {
                assert_eq!(pass_id, pass.id);
                assert_eq!(expired_at, now);
            }
            other => panic!("expected expiry rejection, got {other:?}"),
        }
        assert!(engine.active_sessions(&tenant).unwrap().is_empty());
    }

    #[test]
    fn test_operator_exemption_keeps_proof() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let now = at("2025-04-01T08:00:00Z");

        let mut request = car("KA01");
        request.exempt_requested = true;
        request.proof = Some(ProofRef::new("ambulance-badge"));
        let session = admitted(engine.request_entry(&tenant, request, now).unwrap());

        assert_eq!(session.exemption, ExemptionReason::OperatorGranted);
        assert_eq!(session.proof_ref, Some(ProofRef::new("ambulance-badge")));
    }

    #[test]
    fn test_settle_without_session() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");

        let decision = engine
            .settle_exit(&tenant, &SessionRef::Vehicle(plate("KA01")), at("2025-04-01T08:00:00Z"))
            .unwrap();
        assert!(matches!(decision, SettlementDecision::NoActiveSession));
    }

    #[test]
    fn test_second_settlement_returns_original_receipt() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let entry = at("2025-04-01T08:00:00Z");

        let session = admitted(engine.request_entry(&tenant, car("KA01"), entry).unwrap());
        let first = settled(
            engine
                .settle_exit(&tenant, &SessionRef::Id(session.id), entry + Duration::hours(2))
                .unwrap(),
        );

        match engine
            .settle_exit(&tenant, &SessionRef::Id(session.id), entry + Duration::hours(9))
            .unwrap()
        {
            SettlementDecision::AlreadyCompleted(receipt) => {
                assert_eq!(receipt.amount, first.amount);
                assert_eq!(receipt.exit_time, first.exit_time);
            }
            other => panic!("expected already completed, got {other:?}"),
        }

        // By plate there is simply nothing active any more
        let by_plate = engine
            .settle_exit(&tenant, &SessionRef::Vehicle(plate("KA01")), entry + Duration::hours(9))
            .unwrap();
        assert!(matches!(by_plate, SettlementDecision::NoActiveSession));
    }

    #[test]
    fn test_exit_before_entry_rejected() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let entry = at("2025-04-01T08:00:00Z");

        admitted(engine.request_entry(&tenant, car("KA01"), entry).unwrap());
        let result = engine.settle_exit(
            &tenant,
            &SessionRef::Vehicle(plate("KA01")),
            entry - Duration::minutes(1),
        );
        assert!(matches!(result, Err(ParkingError::InvalidInterval)));
        assert_eq!(engine.active_sessions(&tenant).unwrap().len(), 1);
    }

    #[test]
    fn test_unconfigured_category_fails_and_stays_active() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let entry = at("2025-04-01T08:00:00Z");

        let mut request = car("KA01");
        request.category = VehicleCategory::HeavyVehicle;
        admitted(engine.request_entry(&tenant, request, entry).unwrap());

        let result = engine.settle_exit(
            &tenant,
            &SessionRef::Vehicle(plate("KA01")),
            entry + Duration::hours(3),
        );
        assert!(matches!(result, Err(ParkingError::TariffNotConfigured(_))));
        assert_eq!(engine.active_sessions(&tenant).unwrap().len(), 1);
    }

    #[test]
    fn test_quote_does_not_settle() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let entry = at("2025-04-01T08:00:00Z");

        admitted(engine.request_entry(&tenant, car("KA01"), entry).unwrap());
        let quote = engine
            .quote(&tenant, &SessionRef::Vehicle(plate("KA01")), entry + Duration::hours(13))
            .unwrap()
            .unwrap();

        assert_eq!(quote.fee.amount, 500);
        assert_eq!(quote.settings_version, 1);
        assert_eq!(engine.active_sessions(&tenant).unwrap().len(), 1);
    }

    #[test]
    fn test_settings_update_applies_to_next_settlement() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let entry = at("2025-04-01T08:00:00Z");

        admitted(engine.request_entry(&tenant, car("KA01"), entry).unwrap());

        let mut updated = make_settings();
        updated.grace_period_minutes = 120;
        let snapshot = engine.update_settings(&tenant, updated).unwrap();
        assert_eq!(snapshot.version, 2);

        let closed = settled(
            engine
                .settle_exit(
                    &tenant,
                    &SessionRef::Vehicle(plate("KA01")),
                    entry + Duration::minutes(90),
                )
                .unwrap(),
        );
        assert_eq!(closed.amount, Some(0));
    }

    #[test]
    fn test_daily_summary_counts_completed() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let entry = at("2025-04-01T08:00:00Z");

        admitted(engine.request_entry(&tenant, car("KA01"), entry).unwrap());
        let mut exempt = car("KA02");
        exempt.exempt_requested = true;
        admitted(engine.request_entry(&tenant, exempt, entry).unwrap());
        admitted(engine.request_entry(&tenant, car("KA03"), entry).unwrap());

        for vehicle in ["KA01", "KA02"] {
            settled(
                engine
                    .settle_exit(
                        &tenant,
                        &SessionRef::Vehicle(plate(vehicle)),
                        entry + Duration::minutes(90),
                    )
                    .unwrap(),
            );
        }

        let summary = engine
            .daily_summary(&tenant, entry.date_naive())
            .unwrap();
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.exempt, 1);
        assert_eq!(summary.revenue, 50);
        assert_eq!(summary.billed_minutes, 180);
    }

    #[test]
    fn test_audit_trail_records_decisions() {
        let engine = make_engine();
        let tenant = TenantId::new("lot");
        let now = at("2025-04-01T08:00:00Z");

        admitted(engine.request_entry(&tenant, car("KA01"), now).unwrap());
        engine.request_entry(&tenant, car("KA01"), now).unwrap();

        let audits = engine.recent_audits(&tenant, 10).unwrap();
        assert_eq!(audits.len(), 2);
        assert!(audits
            .iter()
            .any(|a| matches!(a.event, AuditEventType::EntryRejected { .. })));
        assert!(audits
            .iter()
            .any(|a| matches!(a.event, AuditEventType::EntryAdmitted { .. })));
    }

    #[test]
    fn test_concurrent_entries_admit_once() {
        let engine = Arc::new(make_engine());
        let tenant = TenantId::new("lot");
        let now = at("2025-04-01T08:00:00Z");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let tenant = tenant.clone();
                thread::spawn(move || engine.request_entry(&tenant, car("KA01"), now).unwrap())
            })
            .collect();

        let admitted_count = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|d| matches!(d, AdmissionDecision::Admitted(_)))
            .count();

        assert_eq!(admitted_count, 1);
        assert_eq!(engine.active_sessions(&tenant).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_exits_settle_once() {
        let engine = Arc::new(make_engine());
        let tenant = TenantId::new("lot");
        let entry = at("2025-04-01T08:00:00Z");

        let session = admitted(engine.request_entry(&tenant, car("KA01"), entry).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                let tenant = tenant.clone();
                let exit = entry + Duration::minutes(60 + i);
                thread::spawn(move || {
                    engine
                        .settle_exit(&tenant, &SessionRef::Id(session.id), exit)
                        .unwrap()
                })
            })
            .collect();

        let settled_count = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|d| matches!(d, SettlementDecision::Settled(_)))
            .count();

        assert_eq!(settled_count, 1);
    }
}
