//! Shared utilities for parkgate
//!
//! This crate provides:
//! - ID types (SessionId, PassId, TenantId)
//! - The canonical `VehicleId` plate type and its normalization
//! - Time utilities (UTC clock, calendar-month and minute arithmetic)
//! - Error types
//! - Default paths for config and data directories

mod error;
mod ids;
mod paths;
mod plate;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use plate::*;
pub use time::*;
