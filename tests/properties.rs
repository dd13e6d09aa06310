//! Property tests for factor scoring and verdict fusion.

use proptest::prelude::*;
use risk_fusion_engine::feature_extractor::FeatureExtractor;
use risk_fusion_engine::fusion::SignalFusion;
use risk_fusion_engine::geo::GeoAssessment;
use risk_fusion_engine::models::{ModelLoader, ModelSet};
use risk_fusion_engine::risk_factors::RiskFactorEvaluator;
use risk_fusion_engine::types::{Location, Transaction};
use std::sync::OnceLock;

fn models() -> &'static ModelSet {
    static MODELS: OnceLock<ModelSet> = OnceLock::new();
    MODELS.get_or_init(|| ModelLoader::default().train().unwrap())
}

fn any_location() -> impl Strategy<Value = Location> {
    prop::sample::select(Location::ALL.to_vec())
}

fn any_transaction() -> impl Strategy<Value = Transaction> {
    (
        0.0..50_000.0f64,
        0u8..24,
        0u32..60,
        any_location(),
        0.0..=1.0f64,
    )
        .prop_map(|(amount, hour, frequency, location, biometric)| {
            Transaction::new(amount, hour, frequency, location, biometric)
        })
}

fn is_night(hour: u8) -> bool {
    hour < 6 || hour == 23
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_factor_set_is_complete_and_bounded(
        tx in any_transaction(),
        geo_score in 0.0..=1.0f64,
    ) {
        let models = models();
        let assessment = RiskFactorEvaluator::default().evaluate(&tx);
        let features = FeatureExtractor::default().extract(&tx);
        let verdict = SignalFusion::default().fuse(
            &assessment,
            models.classifier.predict(&features).unwrap(),
            models.novelty.predict(&features).unwrap(),
            &GeoAssessment { score: geo_score, reason: None },
        );

        prop_assert_eq!(verdict.risk_factors.len(), 5);
        prop_assert_eq!(verdict.risk_factors.iter().count(), 5);
        for (factor, score) in verdict.risk_factors.iter() {
            prop_assert!((0.0..=1.0).contains(&score), "{} = {}", factor, score);
        }
        prop_assert!((0.0..=100.0).contains(&verdict.fraud_probability));
        prop_assert!((0.0..=1.0).contains(&verdict.overall_risk));
    }

    #[test]
    fn prop_larger_amount_never_lowers_risk(
        a in 0.0..50_000.0f64,
        b in 0.0..50_000.0f64,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let evaluator = RiskFactorEvaluator::default();
        let low_score = evaluator.evaluate(&Transaction::new(low, 12, 1, Location::Delhi, 0.9)).amount;
        let high_score = evaluator.evaluate(&Transaction::new(high, 12, 1, Location::Delhi, 0.9)).amount;
        prop_assert!(low_score <= high_score);
    }

    #[test]
    fn prop_night_hours_score_at_least_day_hours(
        day in 6u8..23,
        night in prop::sample::select(vec![0u8, 1, 2, 3, 4, 5, 23]),
    ) {
        prop_assume!(!is_night(day) && is_night(night));
        let evaluator = RiskFactorEvaluator::default();
        let day_score = evaluator.evaluate(&Transaction::new(100.0, day, 1, Location::Delhi, 0.9)).hour;
        let night_score = evaluator.evaluate(&Transaction::new(100.0, night, 1, Location::Delhi, 0.9)).hour;
        prop_assert!(night_score >= day_score);
    }

    #[test]
    fn prop_probability_is_at_least_classifier_and_geo(
        tx in any_transaction(),
        geo_score in 0.0..=1.0f64,
    ) {
        let models = models();
        let features = FeatureExtractor::default().extract(&tx);
        let classifier = models.classifier.predict(&features).unwrap();
        let verdict = SignalFusion::default().fuse(
            &RiskFactorEvaluator::default().evaluate(&tx),
            classifier,
            models.novelty.predict(&features).unwrap(),
            &GeoAssessment { score: geo_score, reason: None },
        );

        prop_assert!(verdict.fraud_probability >= classifier.fraud_probability);
        prop_assert!(verdict.fraud_probability >= geo_score * 100.0 - 1e-9);
        if geo_score > 0.8 {
            prop_assert!(verdict.is_fraud);
        }
    }
}
