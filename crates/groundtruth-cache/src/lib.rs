//! Ground Truth Cache
//!
//! Per-source cache of resolved metrics with tier-appropriate freshness.
//!
//! # Overview
//!
//! Each source module's successful answers are cached under
//! `(module, entity, metric, period)`. The TTL depends on the module's
//! cache class:
//!
//! | Class | Default TTL | Typical origin |
//! |-------|-------------|----------------|
//! | **Regulatory** | never expires | filed facts |
//! | **LiveMarket** | 5 minutes | live quotes |
//! | **Estimated** | 14 days | private-company estimates |
//! | **Benchmark** | 30 days | industry benchmarks |
//!
//! Eviction is lazy: an expired entry is treated as absent and removed on
//! read. The [`CacheSweeper`] worker additionally sweeps expired entries on
//! an interval so memory does not grow with keys that are never read again.
//!
//! The map is sharded; concurrent lookups for different keys only contend
//! when they hash to the same shard, and reads never touch the network.
//!
//! # Usage
//!
//! ```
//! use groundtruth_cache::{CacheConfig, CacheKey, MetricCache};
//! use groundtruth_domain::CacheClass;
//!
//! let config = CacheConfig::default();
//! let cache = MetricCache::new(&config);
//! let key = CacheKey::new("sec-filings", "ACME-CIK-001", "revenue_total", Some("FY2024"));
//!
//! assert!(cache.get(&key).is_none());
//! assert_eq!(config.ttl_for(CacheClass::Regulatory), None);
//! ```

#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod metrics;
mod worker;

pub use cache::{CacheEntry, CacheKey, MetricCache};
pub use config::CacheConfig;
pub use error::CacheError;
pub use metrics::CacheStats;
pub use worker::CacheSweeper;
