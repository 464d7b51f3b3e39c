//! Sharded in-memory metric cache

use crate::metrics::CacheCounters;
use crate::{CacheConfig, CacheStats};
use groundtruth_domain::FinancialMetric;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Cache key: `(module, entity, metric, period)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Module name
    pub module: String,
    /// Entity identifier
    pub identifier: String,
    /// Metric name
    pub metric: String,
    /// Reporting period
    pub period: Option<String>,
}

impl CacheKey {
    /// Build a key
    pub fn new(
        module: impl Into<String>,
        identifier: impl Into<String>,
        metric: impl Into<String>,
        period: Option<&str>,
    ) -> Self {
        Self {
            module: module.into(),
            identifier: identifier.into(),
            metric: metric.into(),
            period: period.map(str::to_string),
        }
    }

    fn shard_index(&self, shard_count: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        (hasher.finish() as usize) % shard_count
    }
}

/// A cached metric and its expiry
///
/// Read-only after creation; a newer answer replaces the entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value
    pub metric: FinancialMetric,
    /// When the entry was written
    pub inserted_at: Instant,
    /// When the entry stops being served (`None` = never)
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

type Shard = RwLock<HashMap<CacheKey, CacheEntry>>;

/// Per-source metric cache
///
/// Keys are spread over independently locked shards. A read takes a shard
/// read lock only; an expired entry found on read is removed under the
/// shard's write lock and reported as absent.
pub struct MetricCache {
    shards: Vec<Shard>,
    counters: CacheCounters,
}

impl MetricCache {
    /// Create a cache sized from configuration
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_shards(config.shard_count)
    }

    /// Create a cache with an explicit shard count (minimum 1)
    pub fn with_shards(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| RwLock::new(HashMap::new())).collect(),
            counters: CacheCounters::default(),
        }
    }

    fn shard(&self, key: &CacheKey) -> &Shard {
        &self.shards[key.shard_index(self.shards.len())]
    }

    /// Look up a live entry
    pub fn get(&self, key: &CacheKey) -> Option<FinancialMetric> {
        let shard = self.shard(key);
        let now = Instant::now();

        {
            let map = shard.read().unwrap_or_else(PoisonError::into_inner);
            match map.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    self.counters.record_hit();
                    tracing::debug!(module = %key.module, metric = %key.metric, "cache hit");
                    return Some(entry.metric.clone());
                }
                Some(_) => {}
                None => {
                    self.counters.record_miss();
                    return None;
                }
            }
        }

        // Expired: re-check under the write lock, a concurrent put may have replaced it
        let mut map = shard.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = map.get(key) {
            if !entry.is_expired(now) {
                self.counters.record_hit();
                return Some(entry.metric.clone());
            }
            map.remove(key);
            self.counters.record_expired_on_read();
            tracing::debug!(module = %key.module, metric = %key.metric, "cache entry expired");
        }
        self.counters.record_miss();
        None
    }

    /// Store a metric; `ttl = None` means the entry never expires
    ///
    /// A TTL too large to represent as a deadline is treated as no expiry.
    pub fn put(&self, key: CacheKey, metric: FinancialMetric, ttl: Option<Duration>) {
        let now = Instant::now();
        let entry = CacheEntry {
            metric,
            inserted_at: now,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        };
        let mut map = self.shard(&key).write().unwrap_or_else(PoisonError::into_inner);
        map.insert(key, entry);
        self.counters.record_insert();
    }

    /// Full entry for a key, including expired ones (diagnostics)
    pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        let map = self.shard(key).read().unwrap_or_else(PoisonError::into_inner);
        map.get(key).cloned()
    }

    /// Drop a key
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let mut map = self.shard(key).write().unwrap_or_else(PoisonError::into_inner);
        map.remove(key).is_some()
    }

    /// Remove every expired entry, one shard at a time
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for shard in &self.shards {
            let mut map = shard.write().unwrap_or_else(PoisonError::into_inner);
            let before = map.len();
            map.retain(|_, entry| !entry.is_expired(now));
            removed += before - map.len();
        }
        self.counters.record_sweep(removed);
        removed
    }

    /// Number of entries held (expired ones included until evicted)
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of statistics
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len())
    }
}

impl Default for MetricCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundtruth_domain::{
        Confidence, EntityId, ExtractionMethod, Fingerprint, MetricValue, Provenance, SourceType,
        Tier,
    };
    use std::sync::Arc;

    fn metric(amount: f64) -> FinancialMetric {
        FinancialMetric::new(
            EntityId::new("ACME-CIK-001"),
            "revenue_total",
            Some("FY2024".to_string()),
            MetricValue::scalar(amount, "USD"),
            Tier::Tier1,
            Confidence::new(0.95).unwrap(),
            "sec-filings",
            Provenance::new(
                SourceType::RegulatoryFiling,
                ExtractionMethod::DirectField,
                Fingerprint::of(amount.to_string().as_bytes()),
            ),
        )
    }

    fn key() -> CacheKey {
        CacheKey::new("sec-filings", "ACME-CIK-001", "revenue_total", Some("FY2024"))
    }

    #[test]
    fn test_put_then_get() {
        let cache = MetricCache::with_shards(4);
        assert!(cache.get(&key()).is_none());

        cache.put(key(), metric(100.0), None);
        let hit = cache.get(&key()).unwrap();
        assert_eq!(hit.value, MetricValue::scalar(100.0, "USD"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_period_is_part_of_key() {
        let cache = MetricCache::with_shards(4);
        cache.put(key(), metric(100.0), None);
        let other = CacheKey::new("sec-filings", "ACME-CIK-001", "revenue_total", Some("FY2023"));
        assert!(cache.get(&other).is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let cache = MetricCache::with_shards(2);
        cache.put(key(), metric(100.0), Some(Duration::from_millis(10)));
        std::thread::sleep(Duration::from_millis(25));

        assert!(cache.get(&key()).is_none());
        assert!(cache.peek(&key()).is_none(), "expired entry should be removed");
        assert_eq!(cache.stats().expired_on_read, 1);
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let cache = MetricCache::with_shards(2);
        cache.put(key(), metric(100.0), Some(Duration::from_secs(u64::MAX)));

        let entry = cache.peek(&key()).unwrap();
        assert!(entry.expires_at.is_none());
        assert!(cache.get(&key()).is_some());
        assert_eq!(cache.sweep_expired(), 0);
    }

    #[test]
    fn test_put_replaces_entry() {
        let cache = MetricCache::with_shards(2);
        cache.put(key(), metric(100.0), None);
        cache.put(key(), metric(200.0), None);
        assert_eq!(cache.get(&key()).unwrap().value.as_f64(), Some(200.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sweep_expired() {
        let cache = MetricCache::with_shards(8);
        for i in 0..5 {
            let k = CacheKey::new("quotes", format!("T{}", i), "price", None);
            cache.put(k, metric(i as f64), Some(Duration::from_millis(5)));
        }
        cache.put(key(), metric(1.0), None);
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.sweep_expired(), 5);
        assert_eq!(cache.len(), 1);
        let stats = cache.stats();
        assert_eq!(stats.swept, 5);
        assert_eq!(stats.sweep_count, 1);
    }

    #[test]
    fn test_invalidate() {
        let cache = MetricCache::with_shards(2);
        cache.put(key(), metric(1.0), None);
        assert!(cache.invalidate(&key()));
        assert!(!cache.invalidate(&key()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_shards_is_clamped() {
        let cache = MetricCache::with_shards(0);
        cache.put(key(), metric(1.0), None);
        assert!(cache.get(&key()).is_some());
    }

    #[test]
    fn test_concurrent_access_different_keys() {
        let cache = Arc::new(MetricCache::with_shards(16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let k = CacheKey::new("m", format!("E{}-{}", t, i), "revenue", None);
                        cache.put(k.clone(), metric(i as f64), None);
                        assert!(cache.get(&k).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 800);
    }
}
