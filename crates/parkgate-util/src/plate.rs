//! Canonical vehicle plate identifiers
//!
//! Every plate entering the system goes through [`VehicleId::parse`], so
//! store lookups always compare the same canonical text. The canonical form
//! is uppercase ASCII with maximal runs of letters and digits separated by a
//! single space: `"mh-12 ab1234"` becomes `"MH 12 AB 1234"`.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParkingError;

/// Normalized vehicle registration plate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VehicleId(String);

impl VehicleId {
    /// Parse and normalize a raw plate string.
    pub fn parse(raw: &str) -> Result<Self, ParkingError> {
        normalize_plate(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VehicleId {
    type Err = ParkingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for VehicleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// The single normalization function for plate text.
pub fn normalize_plate(raw: &str) -> Result<String, ParkingError> {
    let invalid = |message: &str| ParkingError::InvalidVehicleId {
        raw: raw.to_string(),
        message: message.to_string(),
    };

    let mut compact = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_whitespace() || c == '-' || c == '.' {
            continue;
        }
        if !c.is_ascii_alphanumeric() {
            return Err(invalid("only letters and digits are allowed"));
        }
        compact.push(c.to_ascii_uppercase());
    }

    if compact.is_empty() {
        return Err(invalid("plate is empty"));
    }

    let mut grouped = String::with_capacity(compact.len() * 2);
    let mut prev_digit: Option<bool> = None;
    for c in compact.chars() {
        let is_digit = c.is_ascii_digit();
        if prev_digit.is_some_and(|p| p != is_digit) {
            grouped.push(' ');
        }
        grouped.push(c);
        prev_digit = Some(is_digit);
    }

    Ok(grouped)
}
