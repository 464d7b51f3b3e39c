//! Registry of per-origin limiters

use crate::{LimiterConfig, LimiterError, LimiterStats, OriginLimiter};
use groundtruth_domain::RateBudget;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Owns one [`OriginLimiter`] per origin
///
/// Registration happens at startup; lookups afterwards only take the read
/// lock, and each limiter synchronizes its own bucket, so different origins
/// never contend.
pub struct LimiterRegistry {
    config: LimiterConfig,
    limiters: RwLock<HashMap<String, Arc<OriginLimiter>>>,
}

impl LimiterRegistry {
    /// Create an empty registry
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            limiters: RwLock::new(HashMap::new()),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Register an origin, or return its existing limiter
    ///
    /// The first registration for an origin fixes its budget; later modules
    /// on the same origin share that bucket.
    pub fn register(
        &self,
        origin: &str,
        budget: RateBudget,
    ) -> Result<Arc<OriginLimiter>, LimiterError> {
        let mut limiters = self.limiters.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = limiters.get(origin) {
            if existing.budget() != budget {
                tracing::warn!(
                    origin,
                    "Origin already registered with a different budget, keeping the first"
                );
            }
            return Ok(Arc::clone(existing));
        }

        let limiter = Arc::new(OriginLimiter::new(origin, budget, self.config.max_wait())?);
        limiters.insert(origin.to_string(), Arc::clone(&limiter));
        Ok(limiter)
    }

    /// Limiter for an origin
    pub fn get(&self, origin: &str) -> Option<Arc<OriginLimiter>> {
        self.limiters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(origin)
            .cloned()
    }

    /// Number of registered origins
    pub fn len(&self) -> usize {
        self.limiters.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no origin is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stats for every origin, sorted by origin name
    pub fn stats(&self) -> Vec<(String, LimiterStats)> {
        let limiters = self.limiters.read().unwrap_or_else(PoisonError::into_inner);
        let mut stats: Vec<_> = limiters
            .iter()
            .map(|(origin, limiter)| (origin.clone(), limiter.stats()))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }
}

impl Default for LimiterRegistry {
    fn default() -> Self {
        Self::new(LimiterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let registry = LimiterRegistry::default();
        assert!(registry.is_empty());

        registry.register("edgar", RateBudget::per_second(10)).unwrap();
        assert!(registry.get("edgar").is_some());
        assert!(registry.get("quotes").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_shared_origin_shares_bucket() {
        let registry = LimiterRegistry::new(LimiterConfig::aggressive());
        let a = registry.register("edgar", RateBudget::per_minute(1)).unwrap();
        let b = registry.register("edgar", RateBudget::per_minute(1)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        assert!(a.acquire().await.is_ok());
        assert!(b.acquire().await.unwrap_err().is_throttled());
    }

    #[test]
    fn test_invalid_budget_not_registered() {
        let registry = LimiterRegistry::default();
        assert!(registry.register("bad", RateBudget::per_second(0)).is_err());
        assert!(registry.get("bad").is_none());
    }

    #[test]
    fn test_stats_sorted() {
        let registry = LimiterRegistry::default();
        registry.register("zeta", RateBudget::per_second(1)).unwrap();
        registry.register("alpha", RateBudget::per_second(1)).unwrap();
        let names: Vec<_> = registry.stats().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
