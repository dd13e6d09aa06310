//! Type definitions for the risk fusion engine

pub mod transaction;
pub mod verdict;

pub use transaction::{Location, Transaction};
pub use verdict::{ClassLabel, Novelty, RiskFactor, RiskFactorSet, SignalBreakdown, Verdict};
