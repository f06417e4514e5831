//! SQLite-based store implementation
//!
//! Timestamps are stored as RFC 3339 UTC text with fixed nanosecond
//! precision, so lexicographic order matches chronological order and range
//! queries can compare the text directly.

use chrono::{DateTime, SecondsFormat, Utc};
use parkgate_api::{
    ExemptionReason, Fee, MembershipPass, ParkingSession, ProofRef, SessionStatus, Settings,
    TariffTable, VehicleCategory,
};
use parkgate_util::{PassId, SessionId, TenantId, VehicleId};
use rusqlite::{params, Connection, OptionalExtension, Params, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, Store, StoreError, StoreResult, StoredSettings};

const SESSION_COLUMNS: &str = "id, tenant_id, vehicle_id, category, entry_time, exit_time, \
                               amount, billed_minutes, exemption_reason, proof_ref, status";

const PASS_COLUMNS: &str = "id, tenant_id, vehicle_id, category, holder_name, expiry_date";

const KEY_GRACE_PERIOD: &str = "grace_period_minutes";
const KEY_BASELINE_RATE: &str = "baseline_hourly_rate";
const KEY_TARIFF_TABLE: &str = "tariff_table";
const KEY_VERSION: &str = "version";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        // Another process may hold the write lock briefly (e.g. two gate terminals)
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Parking sessions
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                vehicle_id TEXT NOT NULL,
                category TEXT NOT NULL,
                entry_time TEXT NOT NULL,
                exit_time TEXT,
                amount INTEGER,
                billed_minutes INTEGER,
                is_exempt INTEGER NOT NULL,
                exemption_reason TEXT NOT NULL,
                proof_ref TEXT,
                status TEXT NOT NULL CHECK (status IN ('active', 'completed'))
            );

            -- At most one active session per vehicle per tenant
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_active
                ON sessions(tenant_id, vehicle_id) WHERE status = 'active';

            CREATE INDEX IF NOT EXISTS idx_sessions_exit
                ON sessions(tenant_id, exit_time);

            -- Membership passes
            CREATE TABLE IF NOT EXISTS passes (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                vehicle_id TEXT NOT NULL,
                category TEXT NOT NULL,
                holder_name TEXT NOT NULL,
                expiry_date TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_passes_vehicle ON passes(tenant_id, vehicle_id);

            -- Keyed settings
            CREATE TABLE IF NOT EXISTS settings (
                tenant_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value_json TEXT NOT NULL,
                PRIMARY KEY (tenant_id, key)
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_tenant ON audit_log(tenant_id, id);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

fn read_settings_version(conn: &Connection, tenant: &TenantId) -> StoreResult<u64> {
    let value_json: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE tenant_id = ? AND key = ?",
            params![tenant.as_str(), KEY_VERSION],
            |row| row.get(0),
        )
        .optional()?;

    match value_json {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(0),
    }
}

fn format_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("invalid timestamp '{s}': {e}")))
}

fn to_sql_int(value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::Serialization(format!("{value} exceeds i64")))
}

fn from_sql_int(value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::Serialization(format!("negative value {value}")))
}

fn bad_column(column: &str, value: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization(format!("invalid {column} '{value}': {err}"))
}

/// Session columns as stored, before conversion into domain types
struct SessionRow {
    id: String,
    tenant_id: String,
    vehicle_id: String,
    category: String,
    entry_time: String,
    exit_time: Option<String>,
    amount: Option<i64>,
    billed_minutes: Option<i64>,
    exemption: String,
    proof_ref: Option<String>,
    status: String,
}

impl SessionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            vehicle_id: row.get(2)?,
            category: row.get(3)?,
            entry_time: row.get(4)?,
            exit_time: row.get(5)?,
            amount: row.get(6)?,
            billed_minutes: row.get(7)?,
            exemption: row.get(8)?,
            proof_ref: row.get(9)?,
            status: row.get(10)?,
        })
    }

    fn into_session(self) -> StoreResult<ParkingSession> {
        Ok(ParkingSession {
            id: self
                .id
                .parse::<SessionId>()
                .map_err(|e| bad_column("session id", &self.id, e))?,
            tenant_id: TenantId::new(self.tenant_id),
            vehicle_id: VehicleId::parse(&self.vehicle_id)
                .map_err(|e| bad_column("vehicle id", &self.vehicle_id, e))?,
            category: self
                .category
                .parse::<VehicleCategory>()
                .map_err(|e| bad_column("category", &self.category, e))?,
            entry_time: parse_ts(&self.entry_time)?,
            exit_time: self.exit_time.as_deref().map(parse_ts).transpose()?,
            amount: self.amount.map(from_sql_int).transpose()?,
            billed_minutes: self.billed_minutes.map(from_sql_int).transpose()?,
            exemption: self
                .exemption
                .parse::<ExemptionReason>()
                .map_err(|e| bad_column("exemption reason", &self.exemption, e))?,
            proof_ref: self.proof_ref.map(ProofRef::new),
            status: self
                .status
                .parse::<SessionStatus>()
                .map_err(|e| bad_column("status", &self.status, e))?,
        })
    }
}

fn query_sessions<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<ParkingSession>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, SessionRow::from_row)?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row?.into_session()?);
    }
    Ok(sessions)
}

struct PassRow {
    id: String,
    tenant_id: String,
    vehicle_id: String,
    category: String,
    holder_name: String,
    expiry_date: String,
}

impl PassRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            vehicle_id: row.get(2)?,
            category: row.get(3)?,
            holder_name: row.get(4)?,
            expiry_date: row.get(5)?,
        })
    }

    fn into_pass(self) -> StoreResult<MembershipPass> {
        Ok(MembershipPass {
            id: self
                .id
                .parse::<PassId>()
                .map_err(|e| bad_column("pass id", &self.id, e))?,
            tenant_id: TenantId::new(self.tenant_id),
            vehicle_id: VehicleId::parse(&self.vehicle_id)
                .map_err(|e| bad_column("vehicle id", &self.vehicle_id, e))?,
            category: self
                .category
                .parse::<VehicleCategory>()
                .map_err(|e| bad_column("category", &self.category, e))?,
            holder_name: self.holder_name,
            expiry_date: parse_ts(&self.expiry_date)?,
        })
    }
}

fn query_passes<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<MembershipPass>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, PassRow::from_row)?;

    let mut passes = Vec::new();
    for row in rows {
        passes.push(row?.into_pass()?);
    }
    Ok(passes)
}

impl Store for SqliteStore {
    fn insert_active_session(&self, session: &ParkingSession) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO sessions (id, tenant_id, vehicle_id, category, entry_time, exit_time,
                                  amount, billed_minutes, is_exempt, exemption_reason,
                                  proof_ref, status)
            VALUES (?, ?, ?, ?, ?, NULL, NULL, NULL, ?, ?, ?, 'active')
            "#,
            params![
                session.id.to_string(),
                session.tenant_id.as_str(),
                session.vehicle_id.as_str(),
                session.category.as_str(),
                format_ts(&session.entry_time),
                session.is_exempt(),
                session.exemption.as_str(),
                session.proof_ref.as_ref().map(|p| p.as_str()),
            ],
        )?;

        debug!(
            session_id = %session.id,
            vehicle_id = %session.vehicle_id,
            "Active session inserted"
        );
        Ok(())
    }

    fn complete_session(
        &self,
        tenant: &TenantId,
        id: &SessionId,
        exit_time: DateTime<Utc>,
        fee: Fee,
    ) -> StoreResult<Option<ParkingSession>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            r#"
            UPDATE sessions
            SET status = 'completed', exit_time = ?, amount = ?, billed_minutes = ?
            WHERE tenant_id = ? AND id = ? AND status = 'active'
            "#,
            params![
                format_ts(&exit_time),
                to_sql_int(fee.amount)?,
                to_sql_int(fee.billed_minutes)?,
                tenant.as_str(),
                id.to_string(),
            ],
        )?;

        if updated == 0 {
            return Ok(None);
        }

        let session = query_sessions(
            &tx,
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE tenant_id = ? AND id = ?"),
            params![tenant.as_str(), id.to_string()],
        )?
        .into_iter()
        .next();
        tx.commit()?;

        debug!(session_id = %id, amount = fee.amount, "Session completed");
        Ok(session)
    }

    fn get_session(&self, tenant: &TenantId, id: &SessionId) -> StoreResult<Option<ParkingSession>> {
        let conn = self.conn()?;
        Ok(query_sessions(
            &conn,
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE tenant_id = ? AND id = ?"),
            params![tenant.as_str(), id.to_string()],
        )?
        .into_iter()
        .next())
    }

    fn find_active_session(
        &self,
        tenant: &TenantId,
        vehicle: &VehicleId,
    ) -> StoreResult<Option<ParkingSession>> {
        let conn = self.conn()?;
        Ok(query_sessions(
            &conn,
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions \
                 WHERE tenant_id = ? AND vehicle_id = ? AND status = 'active'"
            ),
            params![tenant.as_str(), vehicle.as_str()],
        )?
        .into_iter()
        .next())
    }

    fn list_active_sessions(&self, tenant: &TenantId) -> StoreResult<Vec<ParkingSession>> {
        let conn = self.conn()?;
        query_sessions(
            &conn,
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions \
                 WHERE tenant_id = ? AND status = 'active' ORDER BY entry_time ASC"
            ),
            params![tenant.as_str()],
        )
    }

    fn list_recent_sessions(
        &self,
        tenant: &TenantId,
        limit: usize,
    ) -> StoreResult<Vec<ParkingSession>> {
        let conn = self.conn()?;
        query_sessions(
            &conn,
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions \
                 WHERE tenant_id = ? ORDER BY entry_time DESC LIMIT ?"
            ),
            params![tenant.as_str(), limit],
        )
    }

    fn list_completed_between(
        &self,
        tenant: &TenantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<ParkingSession>> {
        let conn = self.conn()?;
        query_sessions(
            &conn,
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions \
                 WHERE tenant_id = ? AND status = 'completed' \
                 AND exit_time >= ? AND exit_time < ? ORDER BY exit_time ASC"
            ),
            params![tenant.as_str(), format_ts(&start), format_ts(&end)],
        )
    }

    fn insert_pass(&self, pass: &MembershipPass) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute(
            &format!("INSERT INTO passes ({PASS_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"),
            params![
                pass.id.to_string(),
                pass.tenant_id.as_str(),
                pass.vehicle_id.as_str(),
                pass.category.as_str(),
                pass.holder_name,
                format_ts(&pass.expiry_date),
            ],
        )?;

        debug!(pass_id = %pass.id, vehicle_id = %pass.vehicle_id, "Pass inserted");
        Ok(())
    }

    fn get_pass(&self, tenant: &TenantId, id: &PassId) -> StoreResult<Option<MembershipPass>> {
        let conn = self.conn()?;
        Ok(query_passes(
            &conn,
            &format!("SELECT {PASS_COLUMNS} FROM passes WHERE tenant_id = ? AND id = ?"),
            params![tenant.as_str(), id.to_string()],
        )?
        .into_iter()
        .next())
    }

    fn find_pass_by_vehicle(
        &self,
        tenant: &TenantId,
        vehicle: &VehicleId,
    ) -> StoreResult<Option<MembershipPass>> {
        let conn = self.conn()?;
        Ok(query_passes(
            &conn,
            &format!(
                "SELECT {PASS_COLUMNS} FROM passes WHERE tenant_id = ? AND vehicle_id = ? \
                 ORDER BY expiry_date DESC LIMIT 1"
            ),
            params![tenant.as_str(), vehicle.as_str()],
        )?
        .into_iter()
        .next())
    }

    fn list_passes(&self, tenant: &TenantId) -> StoreResult<Vec<MembershipPass>> {
        let conn = self.conn()?;
        query_passes(
            &conn,
            &format!(
                "SELECT {PASS_COLUMNS} FROM passes WHERE tenant_id = ? ORDER BY expiry_date ASC"
            ),
            params![tenant.as_str()],
        )
    }

    fn update_pass_expiry(
        &self,
        tenant: &TenantId,
        id: &PassId,
        expiry: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE passes SET expiry_date = ? WHERE tenant_id = ? AND id = ?",
            params![format_ts(&expiry), tenant.as_str(), id.to_string()],
        )?;

        debug!(pass_id = %id, expiry = %expiry, updated, "Pass expiry updated");
        Ok(updated > 0)
    }

    fn delete_pass(&self, tenant: &TenantId, id: &PassId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM passes WHERE tenant_id = ? AND id = ?",
            params![tenant.as_str(), id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    fn load_settings(&self, tenant: &TenantId) -> StoreResult<Option<StoredSettings>> {
        let conn = self.conn()?;

        // One statement, so the version and values come from the same commit
        let mut stmt = conn.prepare("SELECT key, value_json FROM settings WHERE tenant_id = ?")?;
        let rows = stmt.query_map([tenant.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut found = false;
        let mut version = 0;
        let mut settings = Settings::default();
        for row in rows {
            let (key, value_json) = row?;
            found = true;
            match key.as_str() {
                KEY_GRACE_PERIOD => settings.grace_period_minutes = serde_json::from_str(&value_json)?,
                KEY_BASELINE_RATE => settings.baseline_hourly_rate = serde_json::from_str(&value_json)?,
                KEY_TARIFF_TABLE => {
                    settings.tariffs = serde_json::from_str::<TariffTable>(&value_json)?
                }
                KEY_VERSION => version = serde_json::from_str(&value_json)?,
                other => warn!(tenant = %tenant, key = other, "Ignoring unknown settings key"),
            }
        }

        Ok(found.then_some(StoredSettings { version, settings }))
    }

    fn settings_version(&self, tenant: &TenantId) -> StoreResult<u64> {
        let conn = self.conn()?;
        read_settings_version(&conn, tenant)
    }

    fn save_settings(&self, tenant: &TenantId, settings: &Settings) -> StoreResult<u64> {
        let mut conn = self.conn()?;
        // Take the write lock up front; the version is read then bumped
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let version = read_settings_version(&tx, tenant)? + 1;
        let entries = [
            (KEY_GRACE_PERIOD, serde_json::to_string(&settings.grace_period_minutes)?),
            (KEY_BASELINE_RATE, serde_json::to_string(&settings.baseline_hourly_rate)?),
            (KEY_TARIFF_TABLE, serde_json::to_string(&settings.tariffs)?),
            (KEY_VERSION, serde_json::to_string(&version)?),
        ];

        for (key, value_json) in entries {
            tx.execute(
                r#"
                INSERT INTO settings (tenant_id, key, value_json)
                VALUES (?, ?, ?)
                ON CONFLICT(tenant_id, key)
                DO UPDATE SET value_json = excluded.value_json
                "#,
                params![tenant.as_str(), key, value_json],
            )?;
        }
        tx.commit()?;

        debug!(tenant = %tenant, version, "Settings saved");
        Ok(version)
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (tenant_id, timestamp, event_json) VALUES (?, ?, ?)",
            params![event.tenant_id.as_str(), format_ts(&event.timestamp), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, tenant: &TenantId, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log \
             WHERE tenant_id = ? ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map(params![tenant.as_str(), limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                tenant_id: tenant.clone(),
                timestamp: parse_ts(&timestamp_str)?,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
