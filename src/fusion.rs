//! Signal fusion: turns independent signals into one verdict.
//!
//! The most alarming single signal wins. Any of the classifier, the novelty
//! detector or a geo jump is enough to flag fraud, and the reported
//! probability is a max rather than an average.

use crate::geo::GeoAssessment;
use crate::models::ClassifierOutput;
use crate::risk_factors::RiskAssessment;
use crate::types::verdict::{ClassLabel, Novelty, RiskFactorSet, SignalBreakdown, Verdict};

/// Combines per-factor scores and model outputs into a [`Verdict`].
#[derive(Debug, Clone)]
pub struct SignalFusion {
    /// Geo score above which the verdict is forced to fraud
    geo_fraud_threshold: f64,
}

impl SignalFusion {
    pub fn new(geo_fraud_threshold: f64) -> Self {
        Self {
            geo_fraud_threshold,
        }
    }

    pub fn fuse(
        &self,
        factors: &RiskAssessment,
        classifier: ClassifierOutput,
        novelty: Novelty,
        geo: &GeoAssessment,
    ) -> Verdict {
        let risk_factors = RiskFactorSet::new(
            factors.amount,
            factors.hour,
            factors.frequency,
            factors.biometrics,
            geo.score,
        );

        let is_fraud = classifier.label == ClassLabel::Fraud
            || novelty == Novelty::Outlier
            || geo.score > self.geo_fraud_threshold;

        let fraud_probability = classifier
            .fraud_probability
            .max(geo.score * 100.0)
            .clamp(0.0, 100.0);

        let reasons = factors
            .reasons
            .iter()
            .cloned()
            .chain(geo.reason.clone())
            .collect();

        Verdict {
            is_fraud,
            fraud_probability,
            reasons,
            overall_risk: risk_factors.mean(),
            risk_factors,
            signals: SignalBreakdown {
                classifier_label: classifier.label,
                classifier_probability: classifier.fraud_probability,
                novelty,
                geo_score: geo.score,
            },
        }
    }
}

impl Default for SignalFusion {
    fn default() -> Self {
        Self::new(0.8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::verdict::RiskFactor;

    fn factors(reasons: &[&str]) -> RiskAssessment {
        RiskAssessment {
            amount: 0.2,
            hour: 0.3,
            frequency: 0.2,
            biometrics: 0.2,
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn legit(probability: f64) -> ClassifierOutput {
        ClassifierOutput {
            label: ClassLabel::Legit,
            fraud_probability: probability,
        }
    }

    #[test]
    fn test_all_quiet_is_legit() {
        let verdict = SignalFusion::default().fuse(
            &factors(&[]),
            legit(4.0),
            Novelty::InDistribution,
            &GeoAssessment::clear(),
        );

        assert!(!verdict.is_fraud);
        assert_eq!(verdict.fraud_probability, 4.0);
        assert!(verdict.reasons.is_empty());
        assert_eq!(verdict.risk_factors.get(RiskFactor::LocationJump), 0.0);
    }

    #[test]
    fn test_novelty_alone_flags_fraud() {
        let verdict = SignalFusion::default().fuse(
            &factors(&[]),
            legit(10.0),
            Novelty::Outlier,
            &GeoAssessment::clear(),
        );
        assert!(verdict.is_fraud);
        assert_eq!(verdict.fraud_probability, 10.0);
    }

    #[test]
    fn test_geo_jump_wins_probability_and_verdict() {
        let geo = GeoAssessment {
            score: 0.95,
            reason: Some("Location jump detected in short time".to_string()),
        };
        let verdict = SignalFusion::default().fuse(
            &factors(&["Transaction at odd hours"]),
            legit(12.5),
            Novelty::InDistribution,
            &geo,
        );

        assert!(verdict.is_fraud);
        assert_eq!(verdict.fraud_probability, 95.0);
        assert_eq!(
            verdict.reasons,
            vec!["Transaction at odd hours", "Location jump detected in short time"]
        );
    }

    #[test]
    fn test_suspicious_geo_raises_probability_without_flagging() {
        let geo = GeoAssessment {
            score: 0.6,
            reason: None,
        };
        let verdict =
            SignalFusion::default().fuse(&factors(&[]), legit(20.0), Novelty::InDistribution, &geo);

        assert!(!verdict.is_fraud);
        assert_eq!(verdict.fraud_probability, 60.0);
    }

    #[test]
    fn test_classifier_fraud_flags() {
        let verdict = SignalFusion::default().fuse(
            &factors(&[]),
            ClassifierOutput {
                label: ClassLabel::Fraud,
                fraud_probability: 88.0,
            },
            Novelty::InDistribution,
            &GeoAssessment::clear(),
        );
        assert!(verdict.is_fraud);
        assert_eq!(verdict.fraud_probability, 88.0);
        assert_eq!(verdict.signals.classifier_label, ClassLabel::Fraud);
    }
}
