//! Trait definitions for external interactions
//!
//! These traits define the boundary between the resolution engine and the
//! data origins it federates. Concrete modules live in other crates.

use crate::{CacheClass, EntityId, FinancialMetric, ModuleError, Tier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outbound request budget a module declares at construction
///
/// Token bucket terms: up to `capacity` requests in a burst, refilled at
/// `capacity` tokens per `per`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBudget {
    /// Bucket capacity (burst size)
    pub capacity: u32,
    /// Interval over which a full bucket refills
    #[serde(with = "duration_ms")]
    pub per: Duration,
}

impl RateBudget {
    /// `capacity` requests per `per`
    pub fn new(capacity: u32, per: Duration) -> Self {
        Self { capacity, per }
    }

    /// `capacity` requests per second
    pub fn per_second(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(1))
    }

    /// `capacity` requests per minute
    pub fn per_minute(capacity: u32) -> Self {
        Self::new(capacity, Duration::from_secs(60))
    }

    /// Time to refill a single token
    pub fn refill_interval(&self) -> Duration {
        if self.capacity == 0 {
            return self.per;
        }
        self.per / self.capacity
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// A pluggable adapter over exactly one external data origin
///
/// Implementations must be stateless across calls apart from their own
/// client configuration, and must never retry internally. Caching and
/// throttling are applied around the module by the engine; a module only
/// performs the live call.
#[async_trait]
pub trait SourceModule: Send + Sync {
    /// Unique module name (also used in cache keys and traces)
    fn name(&self) -> &str;

    /// Authority tier
    fn tier(&self) -> Tier;

    /// Outbound request budget for the origin
    fn rate_budget(&self) -> RateBudget;

    /// Origin the budget applies to
    ///
    /// Modules sharing an origin share one limiter.
    fn origin(&self) -> &str {
        self.name()
    }

    /// Freshness class used to pick a cache TTL
    fn cache_class(&self) -> CacheClass {
        self.tier().default_cache_class()
    }

    /// Query the origin for one metric
    async fn query(
        &self,
        identifier: &EntityId,
        metric: &str,
        period: Option<&str>,
    ) -> Result<FinancialMetric, ModuleError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Confidence, ExtractionMethod, Fingerprint, MetricValue, Provenance, SourceType};

    struct DummyModule;

    #[async_trait]
    impl SourceModule for DummyModule {
        fn name(&self) -> &str {
            "dummy"
        }

        fn tier(&self) -> Tier {
            Tier::Tier2
        }

        fn rate_budget(&self) -> RateBudget {
            RateBudget::per_second(5)
        }

        async fn query(
            &self,
            identifier: &EntityId,
            metric: &str,
            period: Option<&str>,
        ) -> Result<FinancialMetric, ModuleError> {
            if identifier.as_str() != "known" {
                return Err(ModuleError::NotFound);
            }
            Ok(FinancialMetric::new(
                identifier.clone(),
                metric,
                period.map(str::to_string),
                MetricValue::scalar(1.0, "USD"),
                self.tier(),
                Confidence::new(0.7).unwrap(),
                self.name(),
                Provenance::new(
                    SourceType::MarketQuote,
                    ExtractionMethod::DirectField,
                    Fingerprint::of(b"1.0"),
                ),
            ))
        }
    }

    #[test]
    fn test_default_origin_and_class() {
        let module = DummyModule;
        assert_eq!(module.origin(), "dummy");
        assert_eq!(module.cache_class(), CacheClass::LiveMarket);
    }

    #[test]
    fn test_refill_interval() {
        assert_eq!(RateBudget::per_second(4).refill_interval(), Duration::from_millis(250));
        assert_eq!(RateBudget::per_minute(60).refill_interval(), Duration::from_secs(1));
        assert_eq!(RateBudget::new(0, Duration::from_secs(3)).refill_interval(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_module_contract() {
        let module = DummyModule;
        let hit = module.query(&EntityId::new("known"), "price", None).await.unwrap();
        assert_eq!(hit.tier, Tier::Tier2);
        let miss = module.query(&EntityId::new("unknown"), "price", None).await;
        assert_eq!(miss.unwrap_err(), ModuleError::NotFound);
    }
}
