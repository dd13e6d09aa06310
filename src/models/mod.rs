//! In-process fraud models: a supervised classifier and a one-class
//! novelty detector, both trained once at start-up and read-only afterwards.

pub mod classifier;
pub mod loader;
pub mod novelty;

pub use classifier::LogisticClassifier;
pub use loader::{LabeledRow, ModelLoader, ModelSet, TrainingSet};
pub use novelty::KernelNoveltyDetector;

use crate::error::{EngineError, Result};
use crate::feature_extractor::FEATURE_COUNT;
use crate::types::verdict::{ClassLabel, Novelty};

/// Classifier prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierOutput {
    pub label: ClassLabel,
    /// Fraud probability (0 - 100)
    pub fraud_probability: f64,
}

/// Binary fraud discriminator.
pub trait FraudClassifier: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, features: &[f64]) -> Result<ClassifierOutput>;
}

/// One-sided model of legitimate traffic.
pub trait NoveltyDetector: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, features: &[f64]) -> Result<Novelty>;
}

/// Normalizes raw features by fixed input-domain spans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureScale {
    spans: [f64; FEATURE_COUNT],
}

impl FeatureScale {
    pub fn new(spans: [f64; FEATURE_COUNT]) -> Self {
        Self { spans }
    }

    /// Check dimensionality and finiteness, then scale.
    pub fn apply(&self, features: &[f64]) -> Result<[f64; FEATURE_COUNT]> {
        if features.len() != FEATURE_COUNT {
            return Err(EngineError::InvalidInput(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                features.len()
            )));
        }
        if let Some(bad) = features.iter().position(|v| !v.is_finite()) {
            return Err(EngineError::InvalidInput(format!(
                "feature {} is not a finite number",
                bad
            )));
        }

        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, value) in features.iter().enumerate() {
            scaled[i] = value / self.spans[i];
        }
        Ok(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_rejects_wrong_dimensionality() {
        let scale = FeatureScale::new([10_000.0, 23.0, 20.0, 1.0, 1.0]);

        assert!(matches!(
            scale.apply(&[1.0, 2.0, 3.0, 0.0]),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(scale.apply(&[1.0, 2.0, 3.0, 0.0, 0.5, 9.0]).is_err());
        assert!(scale.apply(&[1.0, f64::NAN, 3.0, 0.0, 0.5]).is_err());
    }

    #[test]
    fn test_scale_values() {
        let scale = FeatureScale::new([10_000.0, 23.0, 20.0, 1.0, 1.0]);
        let scaled = scale.apply(&[5_000.0, 23.0, 10.0, 1.0, 0.4]).unwrap();
        assert_eq!(scaled, [0.5, 1.0, 0.5, 1.0, 0.4]);
    }
}
