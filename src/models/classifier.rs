//! Logistic regression fraud classifier

use super::{ClassifierOutput, FeatureScale, FraudClassifier};
use crate::config::ClassifierConfig;
use crate::error::{EngineError, Result};
use crate::feature_extractor::FEATURE_COUNT;
use crate::types::verdict::ClassLabel;
use tracing::debug;

/// L2-regularized logistic regression trained by full-batch gradient descent.
///
/// Training is deterministic: zero initialization, fixed epoch count.
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    weights: [f64; FEATURE_COUNT],
    bias: f64,
    scale: FeatureScale,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticClassifier {
    /// Fit on `(features, label)` rows.
    pub fn train<'a, I>(rows: I, scale: FeatureScale, params: &ClassifierConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a [f64], ClassLabel)>,
    {
        let samples: Vec<([f64; FEATURE_COUNT], f64)> = rows
            .into_iter()
            .map(|(features, label)| {
                let target = if label == ClassLabel::Fraud { 1.0 } else { 0.0 };
                scale.apply(features).map(|x| (x, target))
            })
            .collect::<Result<_>>()
            .map_err(|e| EngineError::ModelUnavailable(format!("bad training row: {}", e)))?;

        if samples.is_empty() {
            return Err(EngineError::ModelUnavailable(
                "classifier has no training rows".to_string(),
            ));
        }

        let n = samples.len() as f64;
        let mut weights = [0.0; FEATURE_COUNT];
        let mut bias = 0.0;

        for _ in 0..params.epochs {
            let mut grad_w = [0.0; FEATURE_COUNT];
            let mut grad_b = 0.0;

            for (x, target) in &samples {
                let z = bias + weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>();
                let err = sigmoid(z) - target;
                for (g, v) in grad_w.iter_mut().zip(x) {
                    *g += err * v;
                }
                grad_b += err;
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= params.learning_rate * (g / n + params.l2 * *w);
            }
            bias -= params.learning_rate * grad_b / n;
        }

        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(EngineError::ModelUnavailable(
                "classifier training diverged".to_string(),
            ));
        }

        debug!(?weights, bias, "Logistic classifier trained");

        Ok(Self {
            weights,
            bias,
            scale,
        })
    }
}

impl FraudClassifier for LogisticClassifier {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn predict(&self, features: &[f64]) -> Result<ClassifierOutput> {
        let x = self.scale.apply(features)?;
        let z = self.bias + self.weights.iter().zip(&x).map(|(w, v)| w * v).sum::<f64>();
        let probability = sigmoid(z);

        Ok(ClassifierOutput {
            label: if probability >= 0.5 {
                ClassLabel::Fraud
            } else {
                ClassLabel::Legit
            },
            fraud_probability: (probability * 100.0).clamp(0.0, 100.0),
        })
    }
}
