//! Transaction data structures for real-time fraud scoring

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Locations the presentation layer may submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Delhi,
    Mumbai,
    London,
    #[serde(rename = "New York")]
    NewYork,
    Toronto,
    Canada,
    Sydney,
    Tokyo,
}

impl Location {
    /// Every supported location, in display order.
    pub const ALL: [Location; 8] = [
        Location::Delhi,
        Location::Mumbai,
        Location::London,
        Location::NewYork,
        Location::Toronto,
        Location::Canada,
        Location::Sydney,
        Location::Tokyo,
    ];

    /// Human-readable name, also used in the ledger.
    pub fn name(&self) -> &'static str {
        match self {
            Location::Delhi => "Delhi",
            Location::Mumbai => "Mumbai",
            Location::London => "London",
            Location::NewYork => "New York",
            Location::Toronto => "Toronto",
            Location::Canada => "Canada",
            Location::Sydney => "Sydney",
            Location::Tokyo => "Tokyo",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Location {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Location::ALL
            .iter()
            .copied()
            .find(|loc| loc.name() == s)
            .ok_or_else(|| EngineError::InvalidInput(format!("unknown location '{}'", s)))
    }
}

/// A single transaction submitted for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction amount
    pub amount: f64,

    /// Hour of day (0-23)
    pub hour: u8,

    /// Transactions seen in the trailing window
    pub frequency: u32,

    /// Where the transaction originated
    pub location: Location,

    /// Behavioral biometrics match score (0.0 - 1.0)
    pub biometric_score: f64,
}

impl Transaction {
    /// Create a transaction without validation.
    pub fn new(
        amount: f64,
        hour: u8,
        frequency: u32,
        location: Location,
        biometric_score: f64,
    ) -> Self {
        Self {
            amount,
            hour,
            frequency,
            location,
            biometric_score,
        }
    }

    /// Range checks owned by the input boundary. The engine itself never
    /// calls this.
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "amount must be a non-negative number, got {}",
                self.amount
            )));
        }
        if self.hour > 23 {
            return Err(EngineError::InvalidInput(format!(
                "hour must be within 0-23, got {}",
                self.hour
            )));
        }
        if !(0.0..=1.0).contains(&self.biometric_score) {
            return Err(EngineError::InvalidInput(format!(
                "biometric_score must be within 0.0-1.0, got {}",
                self.biometric_score
            )));
        }
        Ok(())
    }
}
