//! Training data loading and one-time model construction

use super::{
    FeatureScale, FraudClassifier, KernelNoveltyDetector, LogisticClassifier, NoveltyDetector,
};
use crate::config::ModelsConfig;
use crate::error::{EngineError, Result};
use crate::feature_extractor::FEATURE_COUNT;
use crate::types::verdict::ClassLabel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// One labeled training example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRow {
    pub features: Vec<f64>,
    pub label: ClassLabel,
}

impl LabeledRow {
    fn new(features: [f64; FEATURE_COUNT], label: ClassLabel) -> Self {
        Self {
            features: features.to_vec(),
            label,
        }
    }
}

/// Fixed labeled dataset the models are trained on at start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub rows: Vec<LabeledRow>,
}

impl TrainingSet {
    /// Built-in reference dataset.
    pub fn builtin() -> Self {
        use ClassLabel::{Fraud, Legit};

        Self {
            rows: vec![
                LabeledRow::new([100.0, 10.0, 1.0, 0.0, 0.95], Legit),
                LabeledRow::new([250.0, 12.0, 2.0, 0.0, 0.90], Legit),
                LabeledRow::new([8000.0, 3.0, 12.0, 1.0, 0.2], Fraud),
                LabeledRow::new([7000.0, 2.0, 15.0, 1.0, 0.1], Fraud),
                LabeledRow::new([120.0, 14.0, 1.0, 0.0, 0.92], Legit),
                LabeledRow::new([6500.0, 1.0, 20.0, 1.0, 0.3], Fraud),
            ],
        }
    }

    /// Load a JSON training set (`{"rows": [{"features": [...], "label": "fraud"}]}`).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            EngineError::ModelUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            EngineError::ModelUnavailable(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Both classes must be present and every row must have the model width.
    pub fn validate(&self) -> Result<()> {
        if let Some((index, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.features.len() != FEATURE_COUNT)
        {
            return Err(EngineError::ModelUnavailable(format!(
                "training row {} has {} features, expected {}",
                index,
                row.features.len(),
                FEATURE_COUNT
            )));
        }
        for label in [ClassLabel::Legit, ClassLabel::Fraud] {
            if !self.rows.iter().any(|row| row.label == label) {
                return Err(EngineError::ModelUnavailable(format!(
                    "training set has no {:?} rows",
                    label
                )));
            }
        }
        Ok(())
    }

    pub fn labeled(&self) -> impl Iterator<Item = (&[f64], ClassLabel)> + '_ {
        self.rows.iter().map(|row| (row.features.as_slice(), row.label))
    }

    /// Feature vectors labeled legitimate; the only rows the novelty detector
    /// ever sees.
    pub fn legit_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.rows
            .iter()
            .filter(|row| row.label == ClassLabel::Legit)
            .map(|row| row.features.as_slice())
    }
}

/// Fully initialized, immutable model pair.
pub struct ModelSet {
    pub classifier: Box<dyn FraudClassifier>,
    pub novelty: Box<dyn NoveltyDetector>,
}

impl ModelSet {
    pub fn new(classifier: Box<dyn FraudClassifier>, novelty: Box<dyn NoveltyDetector>) -> Self {
        Self {
            classifier,
            novelty,
        }
    }
}

/// Builds the model set from configuration
pub struct ModelLoader {
    config: ModelsConfig,
}

impl ModelLoader {
    pub fn new(config: ModelsConfig) -> Self {
        Self { config }
    }

    /// Training set from the configured file, or the built-in one.
    pub fn load_training_set(&self) -> Result<TrainingSet> {
        let set = match &self.config.training_data {
            Some(path) => {
                info!(path = %path.display(), "Loading training data");
                TrainingSet::from_path(path)?
            }
            None => TrainingSet::builtin(),
        };
        set.validate()?;
        Ok(set)
    }

    /// Train both models. Either both succeed or start-up fails.
    pub fn train(&self) -> Result<ModelSet> {
        let set = self.load_training_set()?;
        let scale = FeatureScale::new(self.config.feature_spans);

        let classifier = LogisticClassifier::train(set.labeled(), scale, &self.config.classifier)?;
        let novelty = KernelNoveltyDetector::fit(set.legit_rows(), scale, &self.config.novelty)?;

        info!(
            rows = set.rows.len(),
            legit_rows = set.legit_rows().count(),
            classifier = classifier.name(),
            novelty = novelty.name(),
            "Models trained"
        );

        Ok(ModelSet::new(Box::new(classifier), Box::new(novelty)))
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(ModelsConfig::default())
    }
}
