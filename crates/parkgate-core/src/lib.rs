//! Core policy engine and session lifecycle for parkgate
//!
//! This crate is the heart of parkgate, containing:
//! - Fee computation from elapsed time, grace period and tiered tariffs
//! - Membership pass validity and renewal arithmetic
//! - The session store (Active -> Completed, one active session per vehicle)
//! - Entry admission and exit settlement

mod engine;
mod membership;
mod session;
mod settings;
mod tariff;

pub use engine::*;
pub use membership::*;
pub use session::*;
pub use settings::*;
pub use tariff::*;
