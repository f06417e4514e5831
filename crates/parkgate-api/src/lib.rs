//! Domain types for parkgate
//!
//! This crate defines the shapes every other crate agrees on:
//! - Vehicle categories and exemption sources
//! - Parking sessions and membership passes
//! - Tariff tiers, tariff tables and per-tenant settings
//! - Admission rejection reasons and simple aggregates

mod tariff;
mod types;

pub use tariff::*;
pub use types::*;
