//! One-class Gaussian-kernel novelty detector.
//!
//! Support vectors are the legitimate training rows only. The score of a
//! point is its mean RBF similarity to the support; points scoring below
//! `nu * min(training score)` are outliers.

use super::{FeatureScale, NoveltyDetector};
use crate::config::NoveltyConfig;
use crate::error::{EngineError, Result};
use crate::feature_extractor::FEATURE_COUNT;
use crate::types::verdict::Novelty;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct KernelNoveltyDetector {
    support: Vec<[f64; FEATURE_COUNT]>,
    gamma: f64,
    offset: f64,
    scale: FeatureScale,
}

impl KernelNoveltyDetector {
    /// Fit on legitimate feature vectors.
    pub fn fit<'a, I>(legit_rows: I, scale: FeatureScale, params: &NoveltyConfig) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let support = legit_rows
            .into_iter()
            .map(|row| scale.apply(row))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| EngineError::ModelUnavailable(format!("bad training row: {}", e)))?;

        if support.is_empty() {
            return Err(EngineError::ModelUnavailable(
                "novelty detector needs at least one legitimate row".to_string(),
            ));
        }

        let mut detector = Self {
            support,
            gamma: params.gamma,
            offset: 0.0,
            scale,
        };

        let weakest = detector
            .support
            .iter()
            .map(|x| detector.density(x))
            .fold(f64::INFINITY, f64::min);
        detector.offset = params.nu * weakest;

        debug!(
            support = detector.support.len(),
            offset = detector.offset,
            "Novelty detector fitted"
        );

        Ok(detector)
    }

    fn density(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let total: f64 = self
            .support
            .iter()
            .map(|s| {
                let dist_sq: f64 = s.iter().zip(x).map(|(a, b)| (a - b).powi(2)).sum();
                (-self.gamma * dist_sq).exp()
            })
            .sum();
        total / self.support.len() as f64
    }

    /// Mean kernel similarity of `features` to the legitimate support.
    pub fn score(&self, features: &[f64]) -> Result<f64> {
        let x = self.scale.apply(features)?;
        Ok(self.density(&x))
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }
}

impl NoveltyDetector for KernelNoveltyDetector {
    fn name(&self) -> &str {
        "kernel_one_class"
    }

    fn predict(&self, features: &[f64]) -> Result<Novelty> {
        if self.score(features)? < self.offset {
            Ok(Novelty::Outlier)
        } else {
            Ok(Novelty::InDistribution)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrainingSet;

    fn fitted() -> KernelNoveltyDetector {
        let set = TrainingSet::builtin();
        KernelNoveltyDetector::fit(
            set.legit_rows(),
            FeatureScale::new([10_000.0, 23.0, 20.0, 1.0, 1.0]),
            &NoveltyConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_training_rows_are_in_distribution() {
        let detector = fitted();
        for row in TrainingSet::builtin().legit_rows() {
            assert_eq!(detector.predict(row).unwrap(), Novelty::InDistribution);
        }
    }

    #[test]
    fn test_offset_is_half_the_weakest_training_score() {
        let detector = fitted();
        let weakest = TrainingSet::builtin()
            .legit_rows()
            .map(|row| detector.score(row).unwrap())
            .fold(f64::INFINITY, f64::min);

        assert!(detector.offset() > 0.0);
        assert!((detector.offset() - 0.5 * weakest).abs() < 1e-12);
        assert!(detector.score(&[3_000.0, 4.0, 8.0, 1.0, 0.4]).unwrap() < detector.offset());
    }

    #[test]
    fn test_unseen_fraud_pattern_is_outlier() {
        let detector = fitted();
        // Not one of the fraud training rows
        let features = [3_000.0, 4.0, 8.0, 1.0, 0.4];
        assert_eq!(detector.predict(&features).unwrap(), Novelty::Outlier);
    }

    #[test]
    fn test_near_legit_pattern_is_in_distribution() {
        let detector = fitted();
        let features = [100.0, 14.0, 1.0, 0.0, 0.95];
        assert_eq!(detector.predict(&features).unwrap(), Novelty::InDistribution);
    }

    #[test]
    fn test_no_legit_rows_is_unavailable() {
        let result = KernelNoveltyDetector::fit(
            Vec::<&[f64]>::new(),
            FeatureScale::new([1.0; FEATURE_COUNT]),
            &NoveltyConfig::default(),
        );
        assert!(matches!(result, Err(EngineError::ModelUnavailable(_))));
    }

    #[test]
    fn test_wrong_dimensionality_is_rejected() {
        let detector = fitted();
        assert!(matches!(
            detector.predict(&[1.0, 2.0]),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
