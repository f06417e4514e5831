//! Shared types for parkgate

use chrono::{DateTime, NaiveDate, Utc};
use parkgate_util::{ParkingError, PassId, SessionId, TenantId, VehicleId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of vehicle categories. Each needs a tariff entry to be billable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleCategory {
    TwoWheeler,
    FourWheeler,
    HeavyVehicle,
    PublicTransport,
}

impl VehicleCategory {
    pub const ALL: [VehicleCategory; 4] = [
        VehicleCategory::TwoWheeler,
        VehicleCategory::FourWheeler,
        VehicleCategory::HeavyVehicle,
        VehicleCategory::PublicTransport,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TwoWheeler => "two_wheeler",
            Self::FourWheeler => "four_wheeler",
            Self::HeavyVehicle => "heavy_vehicle",
            Self::PublicTransport => "public_transport",
        }
    }
}

impl fmt::Display for VehicleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleCategory {
    type Err = ParkingError;

    /// Accepts `four_wheeler`, `four-wheeler` and `Four Wheeler` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        VehicleCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| ParkingError::validation(format!("unknown vehicle category: {s}")))
    }
}

/// Why a session was marked free of charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExemptionReason {
    #[default]
    None,
    /// The operator toggled the exemption at entry
    OperatorGranted,
    /// A valid membership pass covered the vehicle at entry
    Membership,
}

impl ExemptionReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::OperatorGranted => "operator_granted",
            Self::Membership => "membership",
        }
    }

    pub fn is_exempt(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for ExemptionReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "operator_granted" => Ok(Self::OperatorGranted),
            "membership" => Ok(Self::Membership),
            other => Err(format!("invalid exemption reason: {other}")),
        }
    }
}

/// Session lifecycle. `Active -> Completed` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

impl SessionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(format!("invalid session status: {other}")),
        }
    }
}

/// Opaque reference to exemption proof (e.g. a captured image) held elsewhere
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofRef(String);

impl ProofRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProofRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A vehicle's stay in the facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSession {
    pub id: SessionId,
    pub tenant_id: TenantId,
    pub vehicle_id: VehicleId,
    pub category: VehicleCategory,
    pub entry_time: DateTime<Utc>,
    /// Set exactly once at completion
    pub exit_time: Option<DateTime<Utc>>,
    pub amount: Option<u64>,
    pub billed_minutes: Option<u64>,
    pub exemption: ExemptionReason,
    pub proof_ref: Option<ProofRef>,
    pub status: SessionStatus,
}

impl ParkingSession {
    /// A fresh active session entering at `entry_time`
    pub fn start(
        tenant_id: TenantId,
        vehicle_id: VehicleId,
        category: VehicleCategory,
        exemption: ExemptionReason,
        proof_ref: Option<ProofRef>,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            tenant_id,
            vehicle_id,
            category,
            entry_time,
            exit_time: None,
            amount: None,
            billed_minutes: None,
            exemption,
            proof_ref,
            status: SessionStatus::Active,
        }
    }

    pub fn is_exempt(&self) -> bool {
        self.exemption.is_exempt()
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// How a caller names the session it wants to settle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRef {
    Id(SessionId),
    Vehicle(VehicleId),
}

impl SessionRef {
    /// Interpret operator input. Text that parses as a session id is treated
    /// as one; anything else is normalized as a plate.
    pub fn parse(raw: &str) -> Result<Self, ParkingError> {
        if let Ok(id) = raw.parse::<SessionId>() {
            return Ok(Self::Id(id));
        }
        VehicleId::parse(raw).map(Self::Vehicle)
    }
}

impl fmt::Display for SessionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "session {id}"),
            Self::Vehicle(vehicle) => write!(f, "vehicle {vehicle}"),
        }
    }
}

impl From<SessionId> for SessionRef {
    fn from(id: SessionId) -> Self {
        Self::Id(id)
    }
}

impl From<VehicleId> for SessionRef {
    fn from(vehicle: VehicleId) -> Self {
        Self::Vehicle(vehicle)
    }
}

/// Prepaid monthly membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipPass {
    pub id: PassId,
    pub tenant_id: TenantId,
    pub vehicle_id: VehicleId,
    pub category: VehicleCategory,
    pub holder_name: String,
    /// Moved only forward, and only by renewal
    pub expiry_date: DateTime<Utc>,
}

impl MembershipPass {
    /// The expiry instant itself counts as expired.
    pub fn is_valid_at(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp < self.expiry_date
    }
}

/// Fee computed at settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: u64,
    pub billed_minutes: u64,
}

/// Why an entry was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The vehicle is already parked
    DuplicateActiveSession { session_id: SessionId },
    /// The vehicle holds a pass whose expiry has passed
    MembershipExpired {
        pass_id: PassId,
        expired_at: DateTime<Utc>,
    },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateActiveSession { session_id } => {
                write!(f, "vehicle already has active session {session_id}")
            }
            Self::MembershipExpired { expired_at, .. } => {
                write!(f, "membership expired at {}", expired_at.to_rfc3339())
            }
        }
    }
}

/// Totals for sessions completed on one UTC day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub day: NaiveDate,
    pub completed: u64,
    pub exempt: u64,
    pub revenue: u64,
    pub billed_minutes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_accepts_common_spellings() {
        assert_eq!(
            "four-wheeler".parse::<VehicleCategory>().unwrap(),
            VehicleCategory::FourWheeler
        );
        assert_eq!(
            "Public Transport".parse::<VehicleCategory>().unwrap(),
            VehicleCategory::PublicTransport
        );
        assert!("tractor".parse::<VehicleCategory>().is_err());
    }

    #[test]
    fn category_serialization() {
        let json = serde_json::to_string(&VehicleCategory::HeavyVehicle).unwrap();
        assert_eq!(json, "\"heavy_vehicle\"");
    }

    #[test]
    fn pass_expiry_is_strict() {
        let expiry = DateTime::parse_from_rfc3339("2025-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let pass = MembershipPass {
            id: PassId::new(),
            tenant_id: TenantId::new("lot"),
            vehicle_id: VehicleId::parse("MH12AB1234").unwrap(),
            category: VehicleCategory::FourWheeler,
            holder_name: "R. Iyer".into(),
            expiry_date: expiry,
        };

        assert!(pass.is_valid_at(expiry - chrono::Duration::seconds(1)));
        assert!(!pass.is_valid_at(expiry));
        assert!(!pass.is_valid_at(expiry + chrono::Duration::days(1)));
    }

    #[test]
    fn session_ref_prefers_ids() {
        let id = SessionId::new();
        assert_eq!(SessionRef::parse(&id.to_string()).unwrap(), SessionRef::Id(id));
        assert_eq!(
            SessionRef::parse("mh12ab1234").unwrap(),
            SessionRef::Vehicle(VehicleId::parse("MH 12 AB 1234").unwrap())
        );
        assert!(SessionRef::parse("???").is_err());
    }

    #[test]
    fn rejection_reason_serialization() {
        let reason = RejectionReason::DuplicateActiveSession {
            session_id: SessionId::new(),
        };
        let json = serde_json::to_string(&reason).unwrap();
        assert!(json.contains("duplicate_active_session"));
    }
}
