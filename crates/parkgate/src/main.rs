//! parkgate - parking gate operator console
//!
//! This is the main entry point for the parkgate binary.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Policy engine
//!
//! and then runs a single operator command against them.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use parkgate_api::{
    DailySummary, MembershipPass, ParkingSession, ProofRef, SessionRef, Settings, Tier,
    VehicleCategory,
};
use parkgate_config::{load_config, Config, ServiceConfig};
use parkgate_core::{AdmissionDecision, EntryRequest, PolicyEngine, SettlementDecision};
use parkgate_store::{SqliteStore, Store};
use parkgate_util::{
    database_path, default_config_path, format_datetime_full, PassId, TenantId, VehicleId,
    PARKGATE_CONFIG_ENV, PARKGATE_DATA_DIR_ENV, PARKGATE_TENANT_ENV,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// parkgate - Parking session, tariff and membership engine
#[derive(Parser, Debug)]
#[command(name = "parkgate")]
#[command(about = "Parking gate admission, exit settlement and membership passes", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/parkgate/config.toml)
    #[arg(short, long, env = PARKGATE_CONFIG_ENV, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override
    #[arg(short, long, env = PARKGATE_DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    /// Tenant (parking facility) to operate on
    #[arg(short, long, env = PARKGATE_TENANT_ENV)]
    tenant: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Print results as JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Admit a vehicle at the entry gate
    Enter {
        /// Registration plate
        plate: VehicleId,

        /// Vehicle category (two_wheeler, four_wheeler, heavy_vehicle, public_transport)
        #[arg(short = 'k', long)]
        category: VehicleCategory,

        /// Waive the fee for this visit
        #[arg(long)]
        exempt: bool,

        /// Reference to the exemption proof captured at the gate
        #[arg(long, requires = "exempt")]
        proof: Option<String>,
    },

    /// Settle a vehicle at the exit gate
    Exit {
        /// Session id or registration plate
        target: String,
    },

    /// Show what an active session would be charged now
    Quote {
        /// Session id or registration plate
        target: String,
    },

    /// List vehicles currently parked
    Active,

    /// List the most recent sessions
    History {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// Totals for sessions completed on a UTC day
    Summary {
        /// Day as YYYY-MM-DD (default: today)
        #[arg(long)]
        day: Option<NaiveDate>,
    },

    /// Manage membership passes
    Pass {
        #[command(subcommand)]
        action: PassCommand,
    },

    /// Show or change tariff settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },

    /// Show recent audit events
    Audit {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum PassCommand {
    /// Issue a pass to a vehicle
    Issue {
        plate: VehicleId,

        #[arg(short = 'k', long)]
        category: VehicleCategory,

        /// Name of the pass holder
        #[arg(long)]
        holder: String,

        /// Expiry as RFC 3339, or YYYY-MM-DD for midnight UTC of that day
        #[arg(long, value_parser = parse_expiry)]
        expiry: DateTime<Utc>,
    },

    /// Extend a pass by one calendar month
    Renew { pass_id: PassId },

    /// Delete a pass
    Revoke { pass_id: PassId },

    /// List all passes
    List,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the current settings
    Show,

    /// Set the grace period in minutes
    Grace { minutes: u32 },

    /// Add or replace a tariff tier
    Tier {
        category: VehicleCategory,
        hours: u32,
        amount: u64,
    },

    /// Set the baseline hourly rate, or clear it when omitted
    Baseline { amount: Option<u64> },
}

fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|day| parkgate_util::day_bounds(day).0)
        .map_err(|_| format!("invalid expiry '{raw}': expected RFC 3339 or YYYY-MM-DD"))
}

/// Load configuration, falling back to built-in defaults when the file is absent
fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        warn!(config_path = %path.display(), "Config file not found, using defaults");
        return Ok(Config {
            service: ServiceConfig::default(),
            default_settings: Settings::default(),
        });
    }

    let config = load_config(path)
        .with_context(|| format!("Failed to load config from {:?}", path))?;

    info!(
        config_path = %path.display(),
        categories = config.default_settings.tariffs.categories().count(),
        "Configuration loaded"
    );

    Ok(config)
}

/// Operator console state
struct Console {
    engine: PolicyEngine,
    tenant: TenantId,
    json: bool,
}

impl Console {
    fn new(args: &Args) -> Result<Self> {
        let config = load_or_default(&args.config)?;

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = database_path(&data_dir);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        let tenant = args
            .tenant
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(TenantId::new)
            .unwrap_or(config.service.default_tenant);

        debug!(tenant = %tenant, "Operating on tenant");

        Ok(Self {
            engine: PolicyEngine::new(store, config.default_settings),
            tenant,
            json: args.json,
        })
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }

    fn run(&self, command: Command) -> Result<ExitCode> {
        let now = parkgate_util::now();
        let tenant = &self.tenant;

        match command {
            Command::Enter {
                plate,
                category,
                exempt,
                proof,
            } => {
                let request = EntryRequest {
                    vehicle_id: plate,
                    category,
                    exempt_requested: exempt,
                    proof: proof.map(ProofRef::new),
                };

                match self.engine.request_entry(tenant, request, now)? {
                    AdmissionDecision::Admitted(session) => {
                        self.emit(&session, || format!("ADMITTED\n{}", describe_session(&session)))?;
                        Ok(ExitCode::SUCCESS)
                    }
                    AdmissionDecision::Rejected { reason } => {
                        self.emit(&reason, || format!("REJECTED: {reason}"))?;
                        Ok(ExitCode::FAILURE)
                    }
                }
            }

            Command::Exit { target } => {
                let target = SessionRef::parse(&target)?;
                match self.engine.settle_exit(tenant, &target, now)? {
                    SettlementDecision::Settled(session) => {
                        self.emit(&session, || format!("SETTLED\n{}", describe_session(&session)))?;
                        Ok(ExitCode::SUCCESS)
                    }
                    SettlementDecision::AlreadyCompleted(session) => {
                        self.emit(&session, || {
                            format!("ALREADY SETTLED\n{}", describe_session(&session))
                        })?;
                        Ok(ExitCode::FAILURE)
                    }
                    SettlementDecision::NoActiveSession => {
                        eprintln!("No active session for {target}");
                        Ok(ExitCode::FAILURE)
                    }
                }
            }

            Command::Quote { target } => {
                let target = SessionRef::parse(&target)?;
                match self.engine.quote(tenant, &target, now)? {
                    Some(quote) => {
                        self.emit(&quote.fee, || {
                            format!(
                                "{}\namount due:  {}\nbilled:      {} min\nsettings:    v{}",
                                describe_session(&quote.session),
                                quote.fee.amount,
                                quote.fee.billed_minutes,
                                quote.settings_version
                            )
                        })?;
                        Ok(ExitCode::SUCCESS)
                    }
                    None => {
                        eprintln!("No active session for {target}");
                        Ok(ExitCode::FAILURE)
                    }
                }
            }

            Command::Active => {
                let sessions = self.engine.active_sessions(tenant)?;
                self.emit(&sessions, || list_sessions(&sessions))?;
                Ok(ExitCode::SUCCESS)
            }

            Command::History { limit } => {
                let sessions = self.engine.recent_sessions(tenant, limit)?;
                self.emit(&sessions, || list_sessions(&sessions))?;
                Ok(ExitCode::SUCCESS)
            }

            Command::Summary { day } => {
                let day = day.unwrap_or_else(|| now.date_naive());
                let summary = self.engine.daily_summary(tenant, day)?;
                self.emit(&summary, || describe_summary(&summary))?;
                Ok(ExitCode::SUCCESS)
            }

            Command::Pass { action } => self.run_pass(action, now),

            Command::Settings { action } => self.run_settings(action),

            Command::Audit { limit } => {
                let audits = self.engine.recent_audits(tenant, limit)?;
                self.emit(&audits, || {
                    audits
                        .iter()
                        .map(|a| {
                            format!(
                                "{}  {}",
                                format_datetime_full(&a.timestamp),
                                serde_json::to_string(&a.event).unwrap_or_default()
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                })?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }

    fn run_pass(&self, action: PassCommand, now: DateTime<Utc>) -> Result<ExitCode> {
        let tenant = &self.tenant;

        match action {
            PassCommand::Issue {
                plate,
                category,
                holder,
                expiry,
            } => {
                let pass = self
                    .engine
                    .issue_pass(tenant, plate, category, &holder, expiry)?;
                self.emit(&pass, || describe_pass(&pass, now))?;
            }
            PassCommand::Renew { pass_id } => {
                let pass = self.engine.renew_pass(tenant, &pass_id, now)?;
                self.emit(&pass, || describe_pass(&pass, now))?;
            }
            PassCommand::Revoke { pass_id } => {
                self.engine.revoke_pass(tenant, &pass_id)?;
                self.emit(&pass_id, || format!("Revoked pass {pass_id}"))?;
            }
            PassCommand::List => {
                let passes = self.engine.list_passes(tenant)?;
                self.emit(&passes, || {
                    passes
                        .iter()
                        .map(|p| describe_pass(p, now))
                        .collect::<Vec<_>>()
                        .join("\n\n")
                })?;
            }
        }

        Ok(ExitCode::SUCCESS)
    }

    fn run_settings(&self, action: SettingsCommand) -> Result<ExitCode> {
        let tenant = &self.tenant;
        let current = self.engine.settings(tenant)?;
        let mut settings = (*current.settings).clone();

        match action {
            SettingsCommand::Show => {
                self.emit(current.settings.as_ref(), || {
                    describe_settings(&current.settings, current.version)
                })?;
                return Ok(ExitCode::SUCCESS);
            }
            SettingsCommand::Grace { minutes } => settings.grace_period_minutes = minutes,
            SettingsCommand::Tier {
                category,
                hours,
                amount,
            } => settings.tariffs.upsert_tier(category, Tier::new(hours, amount)),
            SettingsCommand::Baseline { amount } => settings.baseline_hourly_rate = amount,
        }

        let updated = self.engine.update_settings(tenant, settings)?;
        info!(tenant = %tenant, version = updated.version, "Settings updated");
        self.emit(updated.settings.as_ref(), || {
            describe_settings(&updated.settings, updated.version)
        })?;
        Ok(ExitCode::SUCCESS)
    }
}

fn describe_session(session: &ParkingSession) -> String {
    let mut lines = vec![
        format!("session:     {}", session.id),
        format!("vehicle:     {} ({})", session.vehicle_id, session.category),
        format!("entered:     {}", format_datetime_full(&session.entry_time)),
    ];
    if let Some(exit) = &session.exit_time {
        lines.push(format!("exited:      {}", format_datetime_full(exit)));
    }
    if let (Some(amount), Some(minutes)) = (session.amount, session.billed_minutes) {
        lines.push(format!("amount:      {amount}"));
        lines.push(format!("billed:      {minutes} min"));
    }
    if session.is_exempt() {
        lines.push(format!("exemption:   {}", session.exemption.as_str()));
    }
    if let Some(proof) = &session.proof_ref {
        lines.push(format!("proof:       {}", proof.as_str()));
    }
    lines.join("\n")
}

fn list_sessions(sessions: &[ParkingSession]) -> String {
    if sessions.is_empty() {
        return "No sessions".to_string();
    }
    sessions
        .iter()
        .map(|s| {
            format!(
                "{}  {:<14} {:<16} {}  {}",
                s.id,
                s.vehicle_id.as_str(),
                s.category.as_str(),
                format_datetime_full(&s.entry_time),
                s.amount.map_or_else(|| s.status.as_str().to_string(), |a| a.to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_pass(pass: &MembershipPass, now: DateTime<Utc>) -> String {
    format!(
        "pass:        {}\nvehicle:     {} ({})\nholder:      {}\nexpires:     {}{}",
        pass.id,
        pass.vehicle_id,
        pass.category,
        pass.holder_name,
        format_datetime_full(&pass.expiry_date),
        if pass.is_valid_at(now) { "" } else { " (expired)" }
    )
}

fn describe_summary(summary: &DailySummary) -> String {
    format!(
        "day:         {}\ncompleted:   {}\nexempt:      {}\nrevenue:     {}\nbilled:      {} min",
        summary.day, summary.completed, summary.exempt, summary.revenue, summary.billed_minutes
    )
}

fn describe_settings(settings: &Settings, version: u64) -> String {
    let mut lines = vec![
        format!("version:     {version}"),
        format!("grace:       {} min", settings.grace_period_minutes),
        format!(
            "baseline:    {}",
            settings
                .baseline_hourly_rate
                .map_or_else(|| "none".to_string(), |r| format!("{r}/h"))
        ),
    ];
    for (category, tiers) in settings.tariffs.iter() {
        let tiers = tiers
            .iter()
            .map(|t| format!("{}h={}", t.threshold_hours, t.amount))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("{:<13}{tiers}", format!("{category}:")));
    }
    lines.join("\n")
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "parkgate starting");

    if parkgate_util::is_mock_time_active() {
        warn!("Mock time is active");
    }

    let console = Console::new(&args)?;
    console.run(args.command)
}
