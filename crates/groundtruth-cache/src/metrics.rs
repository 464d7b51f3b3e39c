//! Statistics collected by the metric cache

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated without locking
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    expired_on_read: AtomicU64,
    swept: AtomicU64,
    sweep_count: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expired_on_read(&self) {
        self.expired_on_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sweep(&self, removed: usize) {
        self.swept.fetch_add(removed as u64, Ordering::Relaxed);
        self.sweep_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            expired_on_read: self.expired_on_read.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
            sweep_count: self.sweep_count.load(Ordering::Relaxed),
            entries,
        }
    }
}

/// Point-in-time snapshot of cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that returned a live entry
    pub hits: u64,
    /// Reads that found nothing (including expired entries)
    pub misses: u64,
    /// Entries written
    pub inserts: u64,
    /// Expired entries removed lazily on read
    pub expired_on_read: u64,
    /// Expired entries removed by sweeps
    pub swept: u64,
    /// Sweep cycles completed
    pub sweep_count: u64,
    /// Entries currently held
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of reads served from cache
    pub fn hit_ratio(&self) -> f64 {
        let reads = self.hits + self.misses;
        if reads == 0 {
            return 0.0;
        }
        self.hits as f64 / reads as f64
    }

    /// Total expired entries removed by either path
    pub fn total_evicted(&self) -> u64 {
        self.expired_on_read + self.swept
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let lines = [
            "Cache Statistics".to_string(),
            "================".to_string(),
            format!("Entries: {}", self.entries),
            format!("Hits: {}", self.hits),
            format!("Misses: {}", self.misses),
            format!("Hit ratio: {:.1}%", self.hit_ratio() * 100.0),
            format!("Inserts: {}", self.inserts),
            format!("Evicted on read: {}", self.expired_on_read),
            format!("Swept: {} ({} cycles)", self.swept, self.sweep_count),
        ];
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = CacheCounters::default();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        counters.record_insert();
        counters.record_expired_on_read();
        counters.record_sweep(3);

        let stats = counters.snapshot(7);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.total_evicted(), 4);
        assert_eq!(stats.sweep_count, 1);
        assert_eq!(stats.entries, 7);
    }

    #[test]
    fn test_hit_ratio() {
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_ratio() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_summary() {
        let stats = CacheStats {
            hits: 1,
            misses: 1,
            swept: 4,
            sweep_count: 2,
            entries: 9,
            ..Default::default()
        };
        let summary = stats.summary();
        assert!(summary.contains("Entries: 9"));
        assert!(summary.contains("Hit ratio: 50.0%"));
        assert!(summary.contains("Swept: 4 (2 cycles)"));
    }
}
