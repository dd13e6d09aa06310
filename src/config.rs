//! Configuration management for the risk fusion engine

use crate::geo::GeoVelocityConfig;
use crate::risk_factors::RiskPolicyConfig;
use crate::types::transaction::Location;
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "RISK_FUSION_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub detection: DetectionConfig,
    pub risk: RiskPolicyConfig,
    pub geo_velocity: GeoVelocityConfig,
    pub models: ModelsConfig,
    pub presentation: PresentationConfig,
    pub logging: LoggingConfig,
}

/// Decision ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Ledger file (JSON array of records)
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/fraud_ledger.json"),
        }
    }
}

/// Detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Usual locations; anything else sets the location mismatch feature
    pub home_locations: Vec<Location>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            home_locations: vec![Location::Delhi, Location::Mumbai],
        }
    }
}

/// Model training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Optional JSON training set; the built-in dataset is used when absent
    pub training_data: Option<PathBuf>,
    /// Input-domain span per feature, used to normalize model inputs
    pub feature_spans: [f64; 5],
    pub classifier: ClassifierConfig,
    pub novelty: NoveltyConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            training_data: None,
            feature_spans: [10_000.0, 23.0, 20.0, 1.0, 1.0],
            classifier: ClassifierConfig::default(),
            novelty: NoveltyConfig::default(),
        }
    }
}

/// Logistic classifier hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 penalty on the weights
    pub l2: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            epochs: 2_000,
            l2: 0.001,
        }
    }
}

/// Kernel novelty detector hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoveltyConfig {
    /// RBF kernel width
    pub gamma: f64,
    /// Fraction of the weakest training density used as the rejection offset
    pub nu: f64,
}

impl Default for NoveltyConfig {
    fn default() -> Self {
        Self {
            gamma: 20.0,
            nu: 0.5,
        }
    }
}

/// Presentation hints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Factors above this are highlighted as high risk
    pub high_risk_threshold: f64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: 0.6,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file, or the one named by
    /// `RISK_FUSION_CONFIG`.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, with `RISK_FUSION__*`
    /// environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("RISK_FUSION").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = self.risk.validate() {
            bail!("Invalid risk policy: {}", e);
        }
        if let Err(e) = self.geo_velocity.validate() {
            bail!("Invalid geo-velocity settings: {}", e);
        }
        if self.models.feature_spans.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            bail!("models.feature_spans must all be positive");
        }
        if self.models.classifier.epochs == 0 || self.models.classifier.learning_rate <= 0.0 {
            bail!("models.classifier needs a positive learning rate and epoch count");
        }
        if self.models.novelty.gamma <= 0.0 || !(0.0..=1.0).contains(&self.models.novelty.nu) {
            bail!("models.novelty.gamma must be positive and nu within 0.0-1.0");
        }
        if !(0.0..=1.0).contains(&self.presentation.high_risk_threshold) {
            bail!("presentation.high_risk_threshold must be within 0.0-1.0");
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            bail!("logging.format must be \"pretty\" or \"json\", got {:?}", self.logging.format);
        }
        Ok(())
    }
}
