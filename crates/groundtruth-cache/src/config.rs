//! Configuration for the metric cache
//!
//! Defines TTLs per cache class and the sweep interval.

use crate::CacheError;
use groundtruth_domain::CacheClass;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the metric cache
///
/// # Examples
///
/// ```
/// use groundtruth_cache::CacheConfig;
///
/// // Default configuration (balanced)
/// let config = CacheConfig::default();
/// assert_eq!(config.live_market_ttl_secs, 300);
///
/// // Aggressive: shorter freshness windows
/// let config = CacheConfig::aggressive();
/// assert_eq!(config.live_market_ttl_secs, 60);
///
/// // Lenient: longer freshness windows
/// let config = CacheConfig::lenient();
/// assert_eq!(config.live_market_ttl_secs, 900);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for regulatory facts (in seconds)
    /// Default: none, filed facts do not change
    pub regulatory_ttl_secs: Option<u64>,

    /// TTL for live market data (in seconds)
    /// Default: 300 (5 minutes)
    pub live_market_ttl_secs: u64,

    /// TTL for estimated/private-company data (in days)
    /// Default: 14
    pub estimated_ttl_days: u64,

    /// TTL for industry benchmarks (in days)
    /// Default: 30
    pub benchmark_ttl_days: u64,

    /// Number of independently locked shards
    /// Default: 16
    pub shard_count: usize,

    /// How often the background sweeper runs (in seconds)
    /// Default: 600
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            regulatory_ttl_secs: None,
            live_market_ttl_secs: 300,
            estimated_ttl_days: 14,
            benchmark_ttl_days: 30,
            shard_count: 16,
            sweep_interval_secs: 600,
        }
    }
}

impl CacheConfig {
    /// Aggressive freshness (shorter TTLs, frequent sweeps)
    ///
    /// - Regulatory: 7 days
    /// - Live market: 1 minute
    /// - Estimated: 7 days
    /// - Benchmark: 14 days
    pub fn aggressive() -> Self {
        Self {
            regulatory_ttl_secs: Some(7 * 86_400),
            live_market_ttl_secs: 60,
            estimated_ttl_days: 7,
            benchmark_ttl_days: 14,
            shard_count: 16,
            sweep_interval_secs: 120,
        }
    }

    /// Lenient freshness (longer TTLs, infrequent sweeps)
    ///
    /// - Regulatory: never expires
    /// - Live market: 15 minutes
    /// - Estimated: 30 days
    /// - Benchmark: 45 days
    pub fn lenient() -> Self {
        Self {
            regulatory_ttl_secs: None,
            live_market_ttl_secs: 900,
            estimated_ttl_days: 30,
            benchmark_ttl_days: 45,
            shard_count: 16,
            sweep_interval_secs: 3_600,
        }
    }

    /// TTL for a cache class (`None` = never expires)
    ///
    /// Day counts saturate instead of overflowing.
    pub fn ttl_for(&self, class: CacheClass) -> Option<Duration> {
        match class {
            CacheClass::Regulatory => self.regulatory_ttl_secs.map(Duration::from_secs),
            CacheClass::LiveMarket => Some(Duration::from_secs(self.live_market_ttl_secs)),
            CacheClass::Estimated => Some(days(self.estimated_ttl_days)),
            CacheClass::Benchmark => Some(days(self.benchmark_ttl_days)),
        }
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.shard_count == 0 {
            return Err(CacheError::Config("shard_count must be greater than 0".to_string()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(CacheError::Config(
                "sweep_interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

const SECS_PER_DAY: u64 = 86_400;

fn days(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(SECS_PER_DAY))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.regulatory_ttl_secs, None);
        assert_eq!(config.live_market_ttl_secs, 300);
        assert_eq!(config.estimated_ttl_days, 14);
        assert_eq!(config.benchmark_ttl_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_ordered() {
        let aggressive = CacheConfig::aggressive();
        let default = CacheConfig::default();
        let lenient = CacheConfig::lenient();
        assert!(aggressive.live_market_ttl_secs < default.live_market_ttl_secs);
        assert!(lenient.live_market_ttl_secs > default.live_market_ttl_secs);
        assert!(aggressive.validate().is_ok());
        assert!(lenient.validate().is_ok());
    }

    #[test]
    fn test_ttl_for_class() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl_for(CacheClass::Regulatory), None);
        assert_eq!(config.ttl_for(CacheClass::LiveMarket), Some(Duration::from_secs(300)));
        assert_eq!(
            config.ttl_for(CacheClass::Estimated),
            Some(Duration::from_secs(14 * 86_400))
        );
        assert_eq!(
            config.ttl_for(CacheClass::Benchmark),
            Some(Duration::from_secs(30 * 86_400))
        );
    }

    #[test]
    fn test_huge_day_ttl_saturates() {
        let config = CacheConfig {
            estimated_ttl_days: u64::MAX / 1000,
            benchmark_ttl_days: u64::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(
            config.ttl_for(CacheClass::Estimated),
            Some(Duration::from_secs(u64::MAX))
        );
        assert_eq!(
            config.ttl_for(CacheClass::Benchmark),
            Some(Duration::from_secs(u64::MAX))
        );
    }

    #[test]
    fn test_invalid_shard_count() {
        let config = CacheConfig {
            shard_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CacheConfig = toml::from_str("live_market_ttl_secs = 30").unwrap();
        assert_eq!(config.live_market_ttl_secs, 30);
        assert_eq!(config.benchmark_ttl_days, 30);
        assert_eq!(config.shard_count, 16);
    }
}
