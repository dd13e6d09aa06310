//! Decision fusion engine: the orchestrator behind every analysis call.

use crate::config::AppConfig;
use crate::error::Result;
use crate::feature_extractor::FeatureExtractor;
use crate::fusion::SignalFusion;
use crate::geo::{GeoReferenceTable, GeoVelocityHeuristic};
use crate::ledger::{LedgerEntry, LedgerStore};
use crate::metrics::EngineMetrics;
use crate::models::{ModelLoader, ModelSet};
use crate::risk_factors::RiskFactorEvaluator;
use crate::types::transaction::Transaction;
use crate::types::verdict::Verdict;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Scores transactions and records every decision in the ledger.
///
/// All collaborators are owned here and fixed at construction; the ledger is
/// the only mutable state and serializes its own access, so `analyze` may be
/// called from several threads.
pub struct DecisionEngine {
    evaluator: RiskFactorEvaluator,
    extractor: FeatureExtractor,
    models: ModelSet,
    geo_velocity: GeoVelocityHeuristic,
    fusion: SignalFusion,
    ledger: LedgerStore,
    metrics: EngineMetrics,
}

impl DecisionEngine {
    /// Train the models and open the ledger described by `config`.
    ///
    /// Fails if either model cannot be built or the ledger is unreadable.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let models = ModelLoader::new(config.models.clone()).train()?;
        let ledger = LedgerStore::open(&config.ledger.path)?;
        Ok(Self::new(config, models, ledger))
    }

    /// Assemble an engine from already-built parts.
    pub fn new(config: &AppConfig, models: ModelSet, ledger: LedgerStore) -> Self {
        info!(
            classifier = models.classifier.name(),
            novelty = models.novelty.name(),
            ledger = %ledger.path().display(),
            records = ledger.len(),
            home_locations = ?config.detection.home_locations,
            "Decision engine ready"
        );

        Self {
            evaluator: RiskFactorEvaluator::new(config.risk.clone()),
            extractor: FeatureExtractor::new(config.detection.home_locations.iter().copied()),
            models,
            geo_velocity: GeoVelocityHeuristic::new(
                GeoReferenceTable::builtin(),
                config.geo_velocity.clone(),
            ),
            fusion: SignalFusion::new(config.geo_velocity.fraud_threshold),
            ledger,
            metrics: EngineMetrics::new(),
        }
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Analyze one transaction and append the decision to the ledger.
    ///
    /// The verdict is returned only after its record is durably written.
    pub fn analyze(&self, tx: &Transaction) -> Result<Verdict> {
        let start = Instant::now();

        let factors = self.evaluator.evaluate(tx);
        let features = self.extractor.extract(tx);
        let classifier = self.models.classifier.predict(&features)?;
        let novelty = self.models.novelty.predict(&features)?;

        debug!(
            features = ?features.as_slice(),
            classifier_probability = classifier.fraud_probability,
            novelty = ?novelty,
            "Model signals computed"
        );

        let geo_threshold = self.geo_velocity.config().fraud_threshold;
        let (verdict, geo_forced) = self.ledger.append_with(|latest| {
            let geo = self.geo_velocity.evaluate(tx, latest);
            let verdict = self.fusion.fuse(&factors, classifier, novelty, &geo);
            let entry = LedgerEntry::from_decision(tx, features.location_mismatch(), &verdict);
            ((verdict, geo.score > geo_threshold), entry)
        })?;

        let processing_time = start.elapsed();
        self.metrics.record_decision(processing_time, &verdict, geo_forced);

        if verdict.is_fraud {
            warn!(
                amount = tx.amount,
                location = %tx.location,
                fraud_probability = verdict.fraud_probability,
                reasons = ?verdict.reasons,
                processing_time_us = processing_time.as_micros(),
                "Fraudulent transaction detected"
            );
        } else {
            info!(
                amount = tx.amount,
                location = %tx.location,
                fraud_probability = verdict.fraud_probability,
                processing_time_us = processing_time.as_micros(),
                "Transaction legitimate"
            );
        }

        Ok(verdict)
    }
}
