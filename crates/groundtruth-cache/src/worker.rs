//! Background worker that sweeps expired cache entries

use crate::{CacheConfig, CacheError, MetricCache};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Background worker that evicts expired entries on a schedule
///
/// Lazy eviction on read covers keys that are read again; the sweeper
/// covers the rest.
///
/// # Examples
///
/// ```no_run
/// use groundtruth_cache::{CacheConfig, CacheSweeper, MetricCache};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = CacheConfig::default();
///     let cache = Arc::new(MetricCache::new(&config));
///     let sweeper = CacheSweeper::new(cache, &config);
///
///     let shutdown = CancellationToken::new();
///     sweeper.run(shutdown).await?;
///     Ok(())
/// }
/// ```
pub struct CacheSweeper {
    cache: Arc<MetricCache>,
    interval: Duration,
}

impl CacheSweeper {
    /// Create a sweeper for a shared cache
    pub fn new(cache: Arc<MetricCache>, config: &CacheConfig) -> Self {
        Self {
            cache,
            interval: config.sweep_interval(),
        }
    }

    /// Override the sweep interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sweep interval in use
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `shutdown` is cancelled
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Worker`] if the interval is zero.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), CacheError> {
        let mut ticker = self.ticker()?;

        tracing::info!(interval = ?self.interval, "Cache sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, stopping cache sweeper");
                    break;
                }
            }
        }

        tracing::info!("Cache sweeper stopped. Final stats:\n{}", self.cache.stats().summary());
        Ok(())
    }

    /// Run a fixed number of sweep cycles (useful for testing)
    pub async fn run_cycles(&self, cycles: usize) -> Result<usize, CacheError> {
        let mut ticker = self.ticker()?;
        let mut removed = 0;

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting sweep cycle {}/{}", cycle + 1, cycles);
            removed += self.sweep_once();
        }

        Ok(removed)
    }

    fn ticker(&self) -> Result<tokio::time::Interval, CacheError> {
        if self.interval.is_zero() {
            return Err(CacheError::Worker("sweep interval must be non-zero".to_string()));
        }
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Ok(ticker)
    }

    fn sweep_once(&self) -> usize {
        let removed = self.cache.sweep_expired();
        if removed > 0 {
            tracing::info!(removed, remaining = self.cache.len(), "Sweep completed");
        } else {
            tracing::debug!("Sweep completed, nothing expired");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheKey;
    use groundtruth_domain::{
        Confidence, EntityId, ExtractionMethod, FinancialMetric, Fingerprint, MetricValue,
        Provenance, SourceType, Tier,
    };

    fn metric() -> FinancialMetric {
        FinancialMetric::new(
            EntityId::new("ACME"),
            "price",
            None,
            MetricValue::scalar(10.0, "USD"),
            Tier::Tier2,
            Confidence::new(0.8).unwrap(),
            "quotes",
            Provenance::new(
                SourceType::MarketQuote,
                ExtractionMethod::DirectField,
                Fingerprint::of(b"10"),
            ),
        )
    }

    #[tokio::test]
    async fn test_run_cycles_sweeps_expired() {
        let cache = Arc::new(MetricCache::with_shards(4));
        cache.put(
            CacheKey::new("quotes", "ACME", "price", None),
            metric(),
            Some(Duration::from_millis(1)),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;

        let sweeper = CacheSweeper::new(Arc::clone(&cache), &CacheConfig::default())
            .with_interval(Duration::from_millis(5));
        let removed = sweeper.run_cycles(2).await.unwrap();

        assert_eq!(removed, 1);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().sweep_count, 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let cache = Arc::new(MetricCache::with_shards(1));
        let sweeper = CacheSweeper::new(cache, &CacheConfig::default())
            .with_interval(Duration::from_millis(5));
        let shutdown = CancellationToken::new();
        let child = shutdown.clone();

        let handle = tokio::spawn(async move { sweeper.run(child).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.unwrap().unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let cache = Arc::new(MetricCache::with_shards(1));
        let sweeper = CacheSweeper::new(cache, &CacheConfig::default())
            .with_interval(Duration::ZERO);
        assert!(matches!(sweeper.run_cycles(1).await, Err(CacheError::Worker(_))));
    }
}
