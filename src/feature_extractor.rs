//! Feature extraction for classifier and novelty detector inference.
//!
//! Features are produced in the exact order the models were trained on.

use crate::types::transaction::{Location, Transaction};
use std::collections::HashSet;
use std::ops::Deref;

/// Number of features per vector.
pub const FEATURE_COUNT: usize = 5;

/// Model input derived from a transaction:
/// `[amount, hour, frequency, location_mismatch, biometric_score]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn location_mismatch(&self) -> bool {
        self.0[3] > 0.5
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl Deref for FeatureVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

/// Transforms transactions into model input features.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    /// Locations that do not raise the mismatch flag
    home_locations: HashSet<Location>,
}

impl FeatureExtractor {
    pub fn new(home_locations: impl IntoIterator<Item = Location>) -> Self {
        Self {
            home_locations: home_locations.into_iter().collect(),
        }
    }

    /// Extract features from a transaction.
    pub fn extract(&self, tx: &Transaction) -> FeatureVector {
        let mismatch = if self.is_home(tx.location) { 0.0 } else { 1.0 };

        FeatureVector(vec![
            tx.amount,
            f64::from(tx.hour),
            f64::from(tx.frequency),
            mismatch,
            tx.biometric_score,
        ])
    }

    pub fn is_home(&self, location: Location) -> bool {
        self.home_locations.contains(&location)
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn feature_names(&self) -> [&'static str; FEATURE_COUNT] {
        [
            "amount",
            "hour",
            "frequency",
            "location_mismatch",
            "biometric_score",
        ]
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new([Location::Delhi, Location::Mumbai])
    }
}
