//! Server configuration
//!
//! One TOML file configures every subsystem:
//!
//! ```toml
//! [engine]
//! module_timeout_ms = 2000
//!
//! [engine.thresholds]
//! tier1 = 0.85
//!
//! [cache]
//! live_market_ttl_secs = 300
//!
//! [limiter]
//! max_wait_ms = 250
//!
//! [verification]
//! tolerance_pct = 2.0
//!
//! [[modules]]
//! kind = "seeded"
//! name = "sec-filings"
//! profile = "filings"
//!
//! [[seeds]]
//! module = "sec-filings"
//! identifier = "ACME-CIK-001"
//! metric = "revenue_total"
//! period = "FY2024"
//! value = 100000000
//! ```
//!
//! Without any `[[modules]]` the server registers a demo module set.

use groundtruth_cache::CacheConfig;
use groundtruth_domain::{Confidence, MetricValue, Tier};
use groundtruth_engine::{ConfigError, EngineConfig};
use groundtruth_limiter::LimiterConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Claim verification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Largest relative difference (percent) still counted as a match
    /// Default: 2.0
    pub tolerance_pct: f64,

    /// Largest distance between a number and its metric keyword
    /// Default: 80
    pub proximity_chars: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            tolerance_pct: 2.0,
            proximity_chars: 80,
        }
    }
}

impl VerificationConfig {
    /// Exact matches only, keywords must sit right next to numbers
    pub fn aggressive() -> Self {
        Self {
            tolerance_pct: 0.5,
            proximity_chars: 40,
        }
    }

    /// Loose matching for rounded figures in prose
    pub fn lenient() -> Self {
        Self {
            tolerance_pct: 5.0,
            proximity_chars: 160,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance_pct.is_finite() || !(0.0..=100.0).contains(&self.tolerance_pct) {
            return Err(ConfigError::Invalid(format!(
                "verification.tolerance_pct must be between 0 and 100, got {}",
                self.tolerance_pct
            )));
        }
        if self.proximity_chars == 0 {
            return Err(ConfigError::Invalid(
                "verification.proximity_chars must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// How a configured module is implemented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// In-memory fact table filled from `[[seeds]]`
    Seeded,
    /// JSON-over-HTTP origin
    Http,
}

/// One `[[modules]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// Implementation
    pub kind: ModuleKind,
    /// Unique module name
    pub name: String,
    /// Authority tier (required for http; checked against the profile for seeded)
    #[serde(default)]
    pub tier: Option<Tier>,
    /// Seed profile (`filings`, `market_quotes`, `private_estimates`, `benchmarks`)
    #[serde(default)]
    pub profile: Option<String>,
    /// Base URL (http only)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Default confidence for answers that carry none
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Rate-limit origin shared with other modules
    #[serde(default)]
    pub origin: Option<String>,
}

impl ModuleSpec {
    /// A seeded module with the given profile
    pub fn seeded(name: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            kind: ModuleKind::Seeded,
            name: name.into(),
            tier: None,
            profile: Some(profile.into()),
            base_url: None,
            confidence: None,
            origin: None,
        }
    }

    /// An HTTP module at the given tier
    pub fn http(name: impl Into<String>, base_url: impl Into<String>, tier: Tier) -> Self {
        Self {
            kind: ModuleKind::Http,
            name: name.into(),
            tier: Some(tier),
            profile: None,
            base_url: Some(base_url.into()),
            confidence: None,
            origin: None,
        }
    }

    /// Confidence override, validated
    pub fn confidence(&self) -> Result<Option<Confidence>, ConfigError> {
        self.confidence
            .map(|c| {
                Confidence::new(c)
                    .map_err(|e| ConfigError::Invalid(format!("modules.{}: {}", self.name, e)))
            })
            .transpose()
    }
}

/// One `[[seeds]]` entry: a fact for a seeded module
///
/// Exactly one of `value`, `low`/`high` or `text` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedSpec {
    /// Target module name
    pub module: String,
    /// Entity identifier (or classification code for benchmarks)
    pub identifier: String,
    /// Metric name
    pub metric: String,
    /// Reporting period; a period-less fact answers any period
    #[serde(default)]
    pub period: Option<String>,
    /// Scalar value
    #[serde(default)]
    pub value: Option<f64>,
    /// Range lower bound
    #[serde(default)]
    pub low: Option<f64>,
    /// Range upper bound
    #[serde(default)]
    pub high: Option<f64>,
    /// Text value
    #[serde(default)]
    pub text: Option<String>,
    /// Unit tag
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Confidence for this fact (module default otherwise)
    #[serde(default)]
    pub confidence: Option<f64>,
}

fn default_unit() -> String {
    "USD".to_string()
}

impl SeedSpec {
    /// Scalar fact without its own confidence
    pub fn scalar(
        module: &str,
        identifier: &str,
        metric: &str,
        period: Option<&str>,
        value: f64,
        unit: &str,
    ) -> Self {
        Self {
            module: module.to_string(),
            identifier: identifier.to_string(),
            metric: metric.to_string(),
            period: period.map(str::to_string),
            value: Some(value),
            low: None,
            high: None,
            text: None,
            unit: unit.to_string(),
            confidence: None,
        }
    }

    /// Set the fact's own confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// The seeded value
    pub fn metric_value(&self) -> Result<MetricValue, ConfigError> {
        let invalid = |reason: &str| {
            ConfigError::Invalid(format!(
                "seed {}/{}/{}: {}",
                self.module, self.identifier, self.metric, reason
            ))
        };
        match (self.value, self.low, self.high, &self.text) {
            (Some(value), None, None, None) => Ok(MetricValue::scalar(value, self.unit.as_str())),
            (None, Some(low), Some(high), None) => {
                MetricValue::range(low, high, self.unit.as_str()).map_err(|e| invalid(&e.to_string()))
            }
            (None, None, None, Some(text)) => Ok(MetricValue::text(text.as_str())),
            _ => Err(invalid("set exactly one of value, low/high or text")),
        }
    }

    /// The fact's own confidence, validated
    pub fn confidence(&self) -> Result<Option<Confidence>, ConfigError> {
        self.confidence
            .map(|c| {
                Confidence::new(c).map_err(|e| {
                    ConfigError::Invalid(format!("seed {}/{}: {}", self.module, self.identifier, e))
                })
            })
            .transpose()
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundTruthConfig {
    /// Truth Layer settings
    pub engine: EngineConfig,
    /// Cache TTLs and sweeping
    pub cache: CacheConfig,
    /// Rate-limiter queueing
    pub limiter: LimiterConfig,
    /// Claim verification
    pub verification: VerificationConfig,
    /// Source modules, in registration order
    pub modules: Vec<ModuleSpec>,
    /// Facts for seeded modules
    pub seeds: Vec<SeedSpec>,
}

impl GroundTruthConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: GroundTruthConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.cache
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.limiter
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.verification.validate()?;

        let mut names = std::collections::HashSet::new();
        for module in &self.modules {
            if module.name.trim().is_empty() {
                return Err(ConfigError::Invalid("module name is empty".to_string()));
            }
            if !names.insert(module.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate module '{}'", module.name)));
            }
            module.confidence()?;
            if module.kind == ModuleKind::Http && (module.base_url.is_none() || module.tier.is_none()) {
                return Err(ConfigError::Invalid(format!(
                    "modules.{}: http modules need base_url and tier",
                    module.name
                )));
            }
        }
        for seed in &self.seeds {
            seed.metric_value()?;
            seed.confidence()?;
        }
        Ok(())
    }
}
