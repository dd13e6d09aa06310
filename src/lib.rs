//! Risk Fusion Engine Library
//!
//! Scores payment transactions by fusing banded risk factors, a trained
//! classifier, a novelty detector and a geo-velocity check against the
//! previous decision, then records every verdict in a hash-chained ledger.

pub mod config;
pub mod engine;
pub mod error;
pub mod feature_extractor;
pub mod fusion;
pub mod geo;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod risk_factors;
pub mod types;

pub use config::AppConfig;
pub use engine::DecisionEngine;
pub use error::{EngineError, Result};
pub use feature_extractor::FeatureExtractor;
pub use ledger::{LedgerEntry, LedgerRecord, LedgerStore};
pub use types::{Location, RiskFactor, RiskFactorSet, Transaction, Verdict};
