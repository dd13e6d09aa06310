//! Verdict and risk factor data structures

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// One independently scored dimension of fraud risk.
///
/// Declaration order is the canonical reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskFactor {
    Amount,
    Hour,
    Frequency,
    Biometrics,
    LocationJump,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 5] = [
        RiskFactor::Amount,
        RiskFactor::Hour,
        RiskFactor::Frequency,
        RiskFactor::Biometrics,
        RiskFactor::LocationJump,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            RiskFactor::Amount => "Amount",
            RiskFactor::Hour => "Hour",
            RiskFactor::Frequency => "Frequency",
            RiskFactor::Biometrics => "Biometrics",
            RiskFactor::LocationJump => "LocationJump",
        }
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exactly one score in [0, 1] per [`RiskFactor`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RiskFactorSet {
    scores: [f64; 5],
}

impl RiskFactorSet {
    /// Build a set, clamping each score into [0, 1].
    pub fn new(amount: f64, hour: f64, frequency: f64, biometrics: f64, location_jump: f64) -> Self {
        Self {
            scores: [amount, hour, frequency, biometrics, location_jump].map(|s| s.clamp(0.0, 1.0)),
        }
    }

    pub fn get(&self, factor: RiskFactor) -> f64 {
        self.scores[factor.index()]
    }

    /// Always 5.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Factors with their scores in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (RiskFactor, f64)> + '_ {
        RiskFactor::ALL.iter().map(move |&f| (f, self.get(f)))
    }

    /// Unweighted mean of all factor scores.
    pub fn mean(&self) -> f64 {
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    /// Factors strictly above `threshold`, for highlighting in charts.
    pub fn high_risk(&self, threshold: f64) -> Vec<RiskFactor> {
        self.iter()
            .filter(|(_, score)| *score > threshold)
            .map(|(factor, _)| factor)
            .collect()
    }
}

impl Serialize for RiskFactorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (factor, score) in self.iter() {
            map.serialize_entry(factor.name(), &score)?;
        }
        map.end()
    }
}

/// Supervised classifier label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    Legit,
    Fraud,
}

/// Novelty detector outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Novelty {
    InDistribution,
    Outlier,
}

/// Raw per-signal outputs that went into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalBreakdown {
    pub classifier_label: ClassLabel,
    /// Classifier fraud probability (0 - 100)
    pub classifier_probability: f64,
    pub novelty: Novelty,
    pub geo_score: f64,
}

/// Final fraud decision for one transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub is_fraud: bool,
    /// Fraud probability (0 - 100)
    pub fraud_probability: f64,
    /// Triggered reasons in canonical factor order
    pub reasons: Vec<String>,
    pub risk_factors: RiskFactorSet,
    pub signals: SignalBreakdown,
    /// Mean of the factor scores; informational only
    pub overall_risk: f64,
}
