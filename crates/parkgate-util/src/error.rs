//! Error types for parkgate

use thiserror::Error;

use crate::{PassId, VehicleId};

/// Broad classification of a [`ParkingError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input shape or negative interval; nothing was applied
    Validation,
    /// Expected business outcome (duplicate entry, expired pass, ...)
    Policy,
    /// Operator misconfiguration; the engine refuses to guess a price
    Configuration,
    /// The durable store failed; the caller decides whether to resubmit
    Storage,
}

/// Core error type for parkgate operations
#[derive(Debug, Error)]
pub enum ParkingError {
    #[error("Invalid vehicle id '{raw}': {message}")]
    InvalidVehicleId { raw: String, message: String },

    #[error("Exit time precedes entry time")]
    InvalidInterval,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Vehicle {0} already has an active session")]
    DuplicateActiveSession(VehicleId),

    #[error("No active session")]
    NoActiveSession,

    #[error("Session already completed")]
    AlreadyCompleted,

    #[error("Pass not found: {0}")]
    PassNotFound(PassId),

    #[error("Vehicle {0} already holds a membership pass")]
    DuplicatePass(VehicleId),

    #[error("No tariff configured for category '{0}'")]
    TariffNotConfigured(String),

    #[error("No fallback hourly rate for category '{0}'")]
    MissingFallbackRate(String),

    /// The tier amount or hourly rate is too large to bill the stay
    #[error("Fee for category '{0}' exceeds the representable amount")]
    TariffOverflow(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl ParkingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidVehicleId { .. } | Self::InvalidInterval | Self::ValidationError(_) => {
                ErrorKind::Validation
            }
            Self::DuplicateActiveSession(_)
            | Self::NoActiveSession
            | Self::AlreadyCompleted
            | Self::PassNotFound(_)
            | Self::DuplicatePass(_) => ErrorKind::Policy,
            Self::TariffNotConfigured(_)
            | Self::MissingFallbackRate(_)
            | Self::TariffOverflow(_) => ErrorKind::Configuration,
            Self::StorageUnavailable(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParkingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        assert_eq!(ParkingError::InvalidInterval.kind(), ErrorKind::Validation);
        assert_eq!(ParkingError::NoActiveSession.kind(), ErrorKind::Policy);
        assert_eq!(ParkingError::AlreadyCompleted.kind(), ErrorKind::Policy);
        assert_eq!(
            ParkingError::TariffNotConfigured("heavy_vehicle".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ParkingError::TariffOverflow("heavy_vehicle".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(ParkingError::storage("disk full").kind(), ErrorKind::Storage);
    }
}
