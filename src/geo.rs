//! Geo reference table and the geo-velocity heuristic.
//!
//! Coordinates are illustrative latitude/longitude pairs treated as a flat
//! plane. Only the most recent ledger record is consulted.

use crate::ledger::LedgerRecord;
use crate::types::transaction::{Location, Transaction};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Static location → coordinate mapping.
#[derive(Debug, Clone)]
pub struct GeoReferenceTable {
    coordinates: Vec<(Location, (f64, f64))>,
}

impl GeoReferenceTable {
    pub fn builtin() -> Self {
        Self {
            coordinates: vec![
                (Location::Delhi, (28.61, 77.20)),
                (Location::Mumbai, (19.07, 72.87)),
                (Location::London, (51.50, -0.12)),
                (Location::NewYork, (40.71, -74.00)),
                (Location::Toronto, (43.65, -79.38)),
                (Location::Canada, (56.13, -106.35)),
                (Location::Sydney, (-33.87, 151.21)),
                (Location::Tokyo, (35.68, 139.76)),
            ],
        }
    }

    pub fn coordinates(&self, location: Location) -> Option<(f64, f64)> {
        self.coordinates
            .iter()
            .find(|(loc, _)| *loc == location)
            .map(|(_, coords)| *coords)
    }

    /// Resolve a location by its stored name; unknown names yield `None`.
    pub fn resolve(&self, name: &str) -> Option<(f64, f64)> {
        name.parse::<Location>()
            .ok()
            .and_then(|loc| self.coordinates(loc))
    }

    /// Planar distance between two locations.
    pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
        ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
    }
}

impl Default for GeoReferenceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Thresholds for the geo-velocity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoVelocityConfig {
    /// Largest hour gap still considered "short time"
    pub max_hour_gap: u8,
    /// Distance above which a jump is implausible
    pub jump_distance: f64,
    pub jump_score: f64,
    /// Distance above which a move is suspicious but not conclusive
    pub suspicious_distance: f64,
    pub suspicious_score: f64,
    /// Geo score above which the verdict is forced to fraud
    pub fraud_threshold: f64,
    pub reason: String,
}

impl Default for GeoVelocityConfig {
    fn default() -> Self {
        Self {
            max_hour_gap: 2,
            jump_distance: 20.0,
            jump_score: 0.95,
            suspicious_distance: 10.0,
            suspicious_score: 0.6,
            fraud_threshold: 0.8,
            reason: "Location jump detected in short time".to_string(),
        }
    }
}

impl GeoVelocityConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, score) in [
            ("jump_score", self.jump_score),
            ("suspicious_score", self.suspicious_score),
            ("fraud_threshold", self.fraud_threshold),
        ] {
            if !(0.0..=1.0).contains(&score) {
                return Err(format!("geo_velocity.{} must be within 0.0-1.0", name));
            }
        }
        if self.suspicious_distance > self.jump_distance {
            return Err("geo_velocity.suspicious_distance must not exceed jump_distance".to_string());
        }
        Ok(())
    }
}

/// Outcome of the geo-velocity check.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoAssessment {
    pub score: f64,
    pub reason: Option<String>,
}

impl GeoAssessment {
    pub fn clear() -> Self {
        Self {
            score: 0.0,
            reason: None,
        }
    }
}

/// Detects physically implausible travel between consecutive decisions.
#[derive(Debug, Clone, Default)]
pub struct GeoVelocityHeuristic {
    table: GeoReferenceTable,
    config: GeoVelocityConfig,
}

impl GeoVelocityHeuristic {
    pub fn new(table: GeoReferenceTable, config: GeoVelocityConfig) -> Self {
        Self { table, config }
    }

    pub fn config(&self) -> &GeoVelocityConfig {
        &self.config
    }

    /// Compare `tx` against the most recent ledger record, if any.
    pub fn evaluate(&self, tx: &Transaction, last: Option<&LedgerRecord>) -> GeoAssessment {
        let Some(last) = last else {
            return GeoAssessment::clear();
        };

        let hour_diff = (i16::from(tx.hour) - i16::from(last.entry.hour)).unsigned_abs();
        if hour_diff > u16::from(self.config.max_hour_gap) {
            return GeoAssessment::clear();
        }

        let (Some(previous), Some(current)) = (
            self.table.resolve(&last.entry.location),
            self.table.coordinates(tx.location),
        ) else {
            debug!(
                last_location = %last.entry.location,
                location = %tx.location,
                "Location not in geo table, skipping velocity check"
            );
            return GeoAssessment::clear();
        };

        let distance = GeoReferenceTable::distance(previous, current);
        debug!(
            from = %last.entry.location,
            to = %tx.location,
            hour_diff,
            distance,
            "Geo-velocity check"
        );

        if distance > self.config.jump_distance {
            GeoAssessment {
                score: self.config.jump_score,
                reason: Some(self.config.reason.clone()),
            }
        } else if distance > self.config.suspicious_distance {
            GeoAssessment {
                score: self.config.suspicious_score,
                reason: None,
            }
        } else {
            GeoAssessment::clear()
        }
    }
}
