//! Per-module dispatch: cache, then limiter, then live call

use groundtruth_cache::{CacheKey, MetricCache};
use groundtruth_domain::{
    FinancialMetric, MetricRequest, ModuleError, SourceModule, TraceEntry, TraceOutcome,
};
use groundtruth_limiter::OriginLimiter;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Result of consulting one module
#[derive(Debug)]
pub(crate) struct Dispatch {
    pub(crate) index: usize,
    pub(crate) metric: Option<FinancialMetric>,
    pub(crate) entry: TraceEntry,
}

/// A registered module wired to its cache, limiter and timeout
pub(crate) struct ModuleHandle {
    pub(crate) index: usize,
    pub(crate) module: Arc<dyn SourceModule>,
    pub(crate) limiter: Arc<OriginLimiter>,
    pub(crate) cache: Arc<MetricCache>,
    pub(crate) timeout: Duration,
    pub(crate) ttl: Option<Duration>,
    pub(crate) retries: u32,
}

enum LiveOutcome {
    Value(FinancialMetric),
    Failed(ModuleError),
    Throttled,
}

impl ModuleHandle {
    pub(crate) fn name(&self) -> &str {
        self.module.name()
    }

    /// Consult the module for a request
    ///
    /// Never fails: every failure mode becomes a trace outcome.
    pub(crate) async fn dispatch(&self, request: &MetricRequest) -> Dispatch {
        let start = Instant::now();
        let name = self.module.name();
        let tier = self.module.tier();
        let key = CacheKey::new(
            name,
            request.identifier.as_str(),
            request.metric.as_str(),
            request.period.as_deref(),
        );

        if let Some(metric) = self.cache.get(&key) {
            let entry = TraceEntry::new(name, tier, TraceOutcome::CacheHit, elapsed_ms(start))
                .with_confidence(metric.confidence.value());
            return self.finish(Some(metric), entry);
        }

        // The token wait is bounded by the limiter, not the module timeout
        let live_calls = AtomicU32::new(0);
        let outcome = match self.limiter.acquire().await {
            Ok(_) => tokio::time::timeout(self.timeout, self.call_live(request, &live_calls)).await,
            Err(_) => Ok(LiveOutcome::Throttled),
        };
        let live_calls = live_calls.load(Ordering::Relaxed);
        let latency = elapsed_ms(start);

        let (metric, outcome) = match outcome {
            Ok(LiveOutcome::Value(metric)) => match self.check_label(metric) {
                Ok(metric) => {
                    self.cache.put(key, metric.clone(), self.ttl);
                    (Some(metric), TraceOutcome::Hit)
                }
                Err(err) => (None, error_outcome(&err)),
            },
            Ok(LiveOutcome::Failed(ModuleError::NotFound)) => (None, TraceOutcome::Miss),
            Ok(LiveOutcome::Failed(ModuleError::RateLimited)) => (None, TraceOutcome::RateLimited),
            Ok(LiveOutcome::Failed(err)) => (None, error_outcome(&err)),
            Ok(LiveOutcome::Throttled) => (None, TraceOutcome::Throttled),
            Err(_) => {
                tracing::warn!(module = name, timeout = ?self.timeout, "Module timed out");
                (None, TraceOutcome::TimedOut)
            }
        };

        let mut entry = TraceEntry::new(name, tier, outcome, latency).with_live_calls(live_calls);
        if let Some(m) = &metric {
            entry = entry.with_confidence(m.confidence.value());
        }
        self.finish(metric, entry)
    }

    fn finish(&self, metric: Option<FinancialMetric>, entry: TraceEntry) -> Dispatch {
        tracing::debug!(
            module = %entry.module,
            outcome = entry.outcome.as_str(),
            latency_ms = entry.latency_ms,
            "Module consulted"
        );
        Dispatch {
            index: self.index,
            metric,
            entry,
        }
    }

    /// Live call with bounded retries of transient errors
    ///
    /// The first token is taken by the caller; each retry takes another.
    async fn call_live(&self, request: &MetricRequest, live_calls: &AtomicU32) -> LiveOutcome {
        let mut attempt = 0;
        loop {
            if attempt > 0 && self.limiter.acquire().await.is_err() {
                return LiveOutcome::Throttled;
            }

            live_calls.fetch_add(1, Ordering::Relaxed);
            let result = self
                .module
                .query(&request.identifier, &request.metric, request.period.as_deref())
                .await;

            match result {
                Ok(metric) => return LiveOutcome::Value(metric),
                Err(err) if err.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    tracing::debug!(module = self.name(), attempt, error = %err, "Retrying module");
                }
                Err(err) => return LiveOutcome::Failed(err),
            }
        }
    }

    /// A module may only answer at its declared tier
    fn check_label(&self, metric: FinancialMetric) -> Result<FinancialMetric, ModuleError> {
        if metric.tier != self.module.tier() {
            return Err(ModuleError::Malformed(format!(
                "module declared {} but labelled its result {}",
                self.module.tier(),
                metric.tier
            )));
        }
        Ok(metric)
    }
}

fn error_outcome(err: &ModuleError) -> TraceOutcome {
    if let ModuleError::Malformed(message) = err {
        tracing::warn!(message = %message, "Malformed module payload");
    }
    TraceOutcome::Error {
        kind: err.kind().to_string(),
        message: err.to_string(),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
