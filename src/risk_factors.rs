//! Rule-based risk factor scoring.
//!
//! Every factor is an ordered ladder of bands: the first band whose edge
//! matches the input wins, otherwise the fallback score applies. Thresholds
//! live in configuration so each factor can be tuned on its own.

use crate::types::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Edge condition of a single band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandEdge {
    /// value > edge
    Above(f64),
    /// value >= edge
    AtLeast(f64),
    /// value < edge
    Below(f64),
}

impl BandEdge {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            BandEdge::Above(edge) => value > edge,
            BandEdge::AtLeast(edge) => value >= edge,
            BandEdge::Below(edge) => value < edge,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub edge: BandEdge,
    pub score: f64,
}

impl Band {
    pub fn new(edge: BandEdge, score: f64) -> Self {
        Self { edge, score }
    }
}

/// Scoring ladder and reason rule for one factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorPolicy {
    /// Bands checked in order
    pub bands: Vec<Band>,
    /// Score when no band matches
    pub otherwise: f64,
    /// A reason is emitted when the score is strictly above this
    pub reason_above: f64,
    /// Reason text
    pub reason: String,
}

impl FactorPolicy {
    pub fn score(&self, value: f64) -> f64 {
        self.bands
            .iter()
            .find(|band| band.edge.matches(value))
            .map(|band| band.score)
            .unwrap_or(self.otherwise)
    }

    pub fn reason_for(&self, score: f64) -> Option<&str> {
        (score > self.reason_above).then_some(self.reason.as_str())
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        let scores = self.bands.iter().map(|b| b.score).chain([self.otherwise]);
        for score in scores {
            if !(0.0..=1.0).contains(&score) {
                return Err(format!("{} risk score {} outside 0.0-1.0", name, score));
            }
        }
        if self.reason.trim().is_empty() {
            return Err(format!("{} reason text must not be empty", name));
        }
        Ok(())
    }
}

/// Policies for the four transaction-attribute factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicyConfig {
    pub amount: FactorPolicy,
    pub hour: FactorPolicy,
    pub frequency: FactorPolicy,
    pub biometrics: FactorPolicy,
}

impl Default for RiskPolicyConfig {
    fn default() -> Self {
        Self {
            amount: FactorPolicy {
                bands: vec![
                    Band::new(BandEdge::Above(10_000.0), 0.8),
                    Band::new(BandEdge::Above(5_000.0), 0.5),
                ],
                otherwise: 0.2,
                reason_above: 0.7,
                reason: "Unusually large transaction".to_string(),
            },
            hour: FactorPolicy {
                bands: vec![
                    Band::new(BandEdge::Below(6.0), 0.7),
                    Band::new(BandEdge::AtLeast(23.0), 0.7),
                ],
                otherwise: 0.3,
                reason_above: 0.6,
                reason: "Transaction at odd hours".to_string(),
            },
            frequency: FactorPolicy {
                bands: vec![
                    Band::new(BandEdge::AtLeast(10.0), 0.9),
                    Band::new(BandEdge::AtLeast(5.0), 0.6),
                ],
                otherwise: 0.2,
                reason_above: 0.8,
                reason: "Too many transactions in short time".to_string(),
            },
            biometrics: FactorPolicy {
                bands: vec![
                    Band::new(BandEdge::Below(0.3), 0.9),
                    Band::new(BandEdge::Below(0.6), 0.6),
                ],
                otherwise: 0.2,
                reason_above: 0.8,
                reason: "Behavioral mismatch".to_string(),
            },
        }
    }
}

impl RiskPolicyConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.amount.validate("amount")?;
        self.hour.validate("hour")?;
        self.frequency.validate("frequency")?;
        self.biometrics.validate("biometrics")
    }
}

/// Attribute factor scores for one transaction, plus the reasons they
/// triggered in Amount, Hour, Frequency, Biometrics order.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub amount: f64,
    pub hour: f64,
    pub frequency: f64,
    pub biometrics: f64,
    pub reasons: Vec<String>,
}

/// Maps transaction attributes to bounded risk scores.
#[derive(Debug, Clone, Default)]
pub struct RiskFactorEvaluator {
    policy: RiskPolicyConfig,
}

impl RiskFactorEvaluator {
    pub fn new(policy: RiskPolicyConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RiskPolicyConfig {
        &self.policy
    }

    /// Score every attribute factor. Pure and total.
    pub fn evaluate(&self, tx: &Transaction) -> RiskAssessment {
        let scored = [
            (&self.policy.amount, tx.amount),
            (&self.policy.hour, f64::from(tx.hour)),
            (&self.policy.frequency, f64::from(tx.frequency)),
            (&self.policy.biometrics, tx.biometric_score),
        ]
        .map(|(policy, value)| (policy, policy.score(value)));

        let reasons = scored
            .iter()
            .filter_map(|(policy, score)| policy.reason_for(*score))
            .map(str::to_string)
            .collect();

        RiskAssessment {
            amount: scored[0].1,
            hour: scored[1].1,
            frequency: scored[2].1,
            biometrics: scored[3].1,
            reasons,
        }
    }
}
