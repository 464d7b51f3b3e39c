//! Engine configuration
//!
//! Loads tier thresholds, timeouts, retries and per-module overrides from
//! TOML.

use groundtruth_domain::{RateBudget, Tier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Engine configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value is out of range or inconsistent
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Minimum acceptable confidence per tier
///
/// A result below its tier's threshold is never returned as a resolved
/// answer. `tier3 = None` means Tier3 results are accepted at any
/// confidence, as contextual data only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Tier1 threshold
    /// Default: 0.85
    pub tier1: f64,

    /// Tier2 threshold
    /// Default: 0.5
    pub tier2: f64,

    /// Tier3 threshold
    /// Default: none (advisory only)
    pub tier3: Option<f64>,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            tier1: 0.85,
            tier2: 0.5,
            tier3: None,
        }
    }
}

impl TierThresholds {
    /// Threshold for a tier (`None` = accept any confidence)
    pub fn for_tier(&self, tier: Tier) -> Option<f64> {
        match tier {
            Tier::Tier1 => Some(self.tier1),
            Tier::Tier2 => Some(self.tier2),
            Tier::Tier3 => self.tier3,
        }
    }
}

/// Upper bound for tier timeouts and refill intervals (one day)
const MAX_DURATION_MS: u64 = 86_400_000;

/// Per-module overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleOverride {
    /// Per-module timeout (ms)
    pub timeout_ms: Option<u64>,

    /// Cache TTL (s); replaces the TTL of the module's cache class
    pub ttl_secs: Option<u64>,

    /// Token bucket capacity
    pub capacity: Option<u32>,

    /// Time to refill one token (ms)
    pub refill_interval_ms: Option<u64>,
}

impl ModuleOverride {
    /// Apply capacity/refill overrides to a declared budget
    pub fn apply_budget(&self, declared: RateBudget) -> RateBudget {
        if self.capacity.is_none() && self.refill_interval_ms.is_none() {
            return declared;
        }
        let capacity = self.capacity.unwrap_or(declared.capacity);
        let refill = self
            .refill_interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| declared.refill_interval());
        RateBudget::new(capacity, refill.saturating_mul(capacity.max(1)))
    }
}

/// Truth Layer configuration
///
/// # Examples
///
/// ```
/// use groundtruth_engine::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.thresholds.tier1, 0.85);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum acceptable confidence per tier
    pub thresholds: TierThresholds,

    /// Per-module timeout (ms)
    /// Default: 2000
    pub module_timeout_ms: u64,

    /// Overall budget for one tier's fan-out (ms)
    /// Default: 5000
    pub tier_timeout_ms: u64,

    /// Hard ceiling for a whole resolution (ms)
    /// Must exceed the sum of the tier timeouts. Default: 20000
    pub request_timeout_ms: u64,

    /// Retries of `Unavailable` results, inside the module timeout
    /// Default: 0
    pub module_retries: u32,

    /// Overrides keyed by module name
    pub modules: HashMap<String, ModuleOverride>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
            module_timeout_ms: 2_000,
            tier_timeout_ms: 5_000,
            request_timeout_ms: 20_000,
            module_retries: 0,
            modules: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Tight latency budget, stricter thresholds
    pub fn aggressive() -> Self {
        Self {
            thresholds: TierThresholds {
                tier1: 0.9,
                tier2: 0.6,
                tier3: None,
            },
            module_timeout_ms: 1_000,
            tier_timeout_ms: 2_000,
            request_timeout_ms: 8_000,
            module_retries: 0,
            modules: HashMap::new(),
        }
    }

    /// Generous latency budget, one retry
    pub fn lenient() -> Self {
        Self {
            thresholds: TierThresholds {
                tier1: 0.8,
                tier2: 0.4,
                tier3: None,
            },
            module_timeout_ms: 5_000,
            tier_timeout_ms: 10_000,
            request_timeout_ms: 40_000,
            module_retries: 1,
            modules: HashMap::new(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        for (name, value) in [("tier1", Some(t.tier1)), ("tier2", Some(t.tier2)), ("tier3", t.tier3)] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(ConfigError::Invalid(format!(
                        "thresholds.{name} must be between 0.0 and 1.0, got {v}"
                    )));
                }
            }
        }
        if self.module_timeout_ms == 0 || self.tier_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be greater than 0".to_string()));
        }
        if self.tier_timeout_ms > MAX_DURATION_MS {
            return Err(ConfigError::Invalid(format!(
                "tier_timeout_ms must be at most {MAX_DURATION_MS}, got {}",
                self.tier_timeout_ms
            )));
        }
        if self.module_timeout_ms > self.tier_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "module_timeout_ms ({}) exceeds tier_timeout_ms ({})",
                self.module_timeout_ms, self.tier_timeout_ms
            )));
        }
        let tiers_total = self.tier_timeout_ms.saturating_mul(Tier::ALL.len() as u64);
        if self.request_timeout_ms <= tiers_total {
            return Err(ConfigError::Invalid(format!(
                "request_timeout_ms ({}) must exceed the sum of tier timeouts ({})",
                self.request_timeout_ms, tiers_total
            )));
        }
        for (name, module) in &self.modules {
            if module.capacity == Some(0) {
                return Err(ConfigError::Invalid(format!("modules.{name}.capacity must be > 0")));
            }
            if module.timeout_ms == Some(0) || module.refill_interval_ms == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "modules.{name}: durations must be greater than 0"
                )));
            }
            if module.timeout_ms.is_some_and(|ms| ms > self.tier_timeout_ms) {
                return Err(ConfigError::Invalid(format!(
                    "modules.{name}.timeout_ms exceeds tier_timeout_ms ({})",
                    self.tier_timeout_ms
                )));
            }
            if module.refill_interval_ms.is_some_and(|ms| ms > MAX_DURATION_MS) {
                return Err(ConfigError::Invalid(format!(
                    "modules.{name}.refill_interval_ms must be at most {MAX_DURATION_MS}"
                )));
            }
        }
        Ok(())
    }

    /// Get per-module timeout as Duration, honoring overrides
    pub fn module_timeout(&self, module: &str) -> Duration {
        let ms = self
            .modules
            .get(module)
            .and_then(|o| o.timeout_ms)
            .unwrap_or(self.module_timeout_ms);
        Duration::from_millis(ms)
    }

    /// Get tier timeout as Duration
    pub fn tier_timeout(&self) -> Duration {
        Duration::from_millis(self.tier_timeout_ms)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Override for a module, if configured
    pub fn override_for(&self, module: &str) -> Option<&ModuleOverride> {
        self.modules.get(module)
    }
}
