//! Audit event types

use chrono::{DateTime, Utc};
use parkgate_api::{RejectionReason, VehicleCategory};
use parkgate_util::{PassId, SessionId, TenantId, VehicleId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// A vehicle was admitted and a session opened
    EntryAdmitted {
        session_id: SessionId,
        vehicle_id: VehicleId,
        category: VehicleCategory,
        exempt: bool,
    },

    /// A vehicle was turned away
    EntryRejected {
        vehicle_id: VehicleId,
        reason: RejectionReason,
    },

    /// A session was settled at exit
    ExitSettled {
        session_id: SessionId,
        vehicle_id: VehicleId,
        amount: u64,
        billed_minutes: u64,
    },

    PassIssued {
        pass_id: PassId,
        vehicle_id: VehicleId,
        expiry_date: DateTime<Utc>,
    },

    PassRenewed {
        pass_id: PassId,
        previous_expiry: DateTime<Utc>,
        new_expiry: DateTime<Utc>,
    },

    PassRevoked { pass_id: PassId },

    /// Billing settings replaced
    SettingsUpdated { version: u64 },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    pub tenant_id: TenantId,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(tenant_id: TenantId, event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            tenant_id,
            timestamp: parkgate_util::now(),
            event,
        }
    }
}
