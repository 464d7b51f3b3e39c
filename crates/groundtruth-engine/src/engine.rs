//! The Unified Truth Layer

use crate::dispatch::{Dispatch, ModuleHandle};
use crate::registry::{ModuleDescriptor, ModuleRegistry};
use crate::selection::{select_best, Candidate};
use crate::{EngineConfig, EngineError};
use groundtruth_cache::{CacheConfig, CacheStats, MetricCache};
use groundtruth_domain::{
    FinancialMetric, MetricRequest, ResolutionTrace, SourceModule, Tier, TraceEntry, TraceOutcome,
};
use groundtruth_limiter::{LimiterConfig, LimiterRegistry, LimiterStats};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Terminal outcome of a resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// A tier produced an acceptable answer
    Resolved {
        /// The selected answer
        metric: FinancialMetric,
    },
    /// No tier produced an acceptable answer
    Unresolved {
        /// Best result seen, below its tier's threshold
        best_candidate: Option<FinancialMetric>,
    },
}

/// Answer plus the audit trail that produced it
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// Outcome
    #[serde(flatten)]
    pub outcome: ResolutionOutcome,
    /// Every module consulted, in tier then registration order
    pub trace: ResolutionTrace,
}

impl Resolution {
    /// The resolved answer, if any
    pub fn metric(&self) -> Option<&FinancialMetric> {
        match &self.outcome {
            ResolutionOutcome::Resolved { metric } => Some(metric),
            ResolutionOutcome::Unresolved { .. } => None,
        }
    }

    /// The below-threshold candidate of an unresolved outcome
    pub fn best_candidate(&self) -> Option<&FinancialMetric> {
        match &self.outcome {
            ResolutionOutcome::Resolved { .. } => None,
            ResolutionOutcome::Unresolved { best_candidate } => best_candidate.as_ref(),
        }
    }

    /// Whether a tier produced an acceptable answer
    pub fn is_resolved(&self) -> bool {
        matches!(self.outcome, ResolutionOutcome::Resolved { .. })
    }

    /// Take the resolved answer
    pub fn into_metric(self) -> Option<FinancialMetric> {
        match self.outcome {
            ResolutionOutcome::Resolved { metric } => Some(metric),
            ResolutionOutcome::Unresolved { .. } => None,
        }
    }
}

/// Builder for [`TruthLayer`]
pub struct TruthLayerBuilder {
    config: EngineConfig,
    cache_config: CacheConfig,
    limiter_config: LimiterConfig,
    cache: Option<Arc<MetricCache>>,
    registry: ModuleRegistry,
    errors: Vec<EngineError>,
}

impl TruthLayerBuilder {
    fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            cache_config: CacheConfig::default(),
            limiter_config: LimiterConfig::default(),
            cache: None,
            registry: ModuleRegistry::new(),
            errors: Vec::new(),
        }
    }

    /// Engine configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Cache configuration
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Limiter configuration
    pub fn limiter_config(mut self, config: LimiterConfig) -> Self {
        self.limiter_config = config;
        self
    }

    /// Share an existing cache (e.g. with a sweeper)
    pub fn cache(mut self, cache: Arc<MetricCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Register a module; registration order is the final tie-breaker
    pub fn module<M: SourceModule + 'static>(self, module: M) -> Self {
        self.module_arc(Arc::new(module))
    }

    /// Register a shared module
    pub fn module_arc(mut self, module: Arc<dyn SourceModule>) -> Self {
        if let Err(err) = self.registry.register(module) {
            self.errors.push(err);
        }
        self
    }

    /// Validate configuration and wire every module to its cache and limiter
    pub fn build(mut self) -> Result<TruthLayer, EngineError> {
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }
        self.config.validate()?;
        self.cache_config
            .validate()
            .map_err(|e| EngineError::Registration(e.to_string()))?;
        self.limiter_config
            .validate()
            .map_err(|e| EngineError::Registration(e.to_string()))?;
        if self.registry.is_empty() {
            return Err(EngineError::NoModules);
        }

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MetricCache::new(&self.cache_config)));
        let limiters = Arc::new(LimiterRegistry::new(self.limiter_config));

        let mut handles = Vec::with_capacity(self.registry.len());
        let mut descriptors = Vec::with_capacity(self.registry.len());
        for (index, module) in self.registry.iter() {
            let overrides = self.config.override_for(module.name());
            let budget = overrides
                .map(|o| o.apply_budget(module.rate_budget()))
                .unwrap_or_else(|| module.rate_budget());
            let limiter = limiters
                .register(module.origin(), budget)
                .map_err(|e| EngineError::Registration(e.to_string()))?;
            let ttl = match overrides.and_then(|o| o.ttl_secs) {
                Some(secs) => Some(Duration::from_secs(secs)),
                None => self.cache_config.ttl_for(module.cache_class()),
            };

            descriptors.push(ModuleDescriptor {
                index,
                name: module.name().to_string(),
                tier: module.tier(),
                origin: module.origin().to_string(),
                rate_budget: limiter.budget(),
                cache_class: module.cache_class().as_str().to_string(),
            });
            handles.push(Arc::new(ModuleHandle {
                index,
                module: Arc::clone(module),
                limiter,
                cache: Arc::clone(&cache),
                timeout: self.config.module_timeout(module.name()),
                ttl,
                retries: self.config.module_retries,
            }));
        }

        tracing::info!(
            modules = handles.len(),
            origins = limiters.len(),
            "Truth Layer ready"
        );

        Ok(TruthLayer {
            config: self.config,
            handles,
            descriptors,
            cache,
            limiters,
        })
    }
}

/// Orchestrates source modules by authority tier
///
/// Holds no per-request state; concurrent resolutions share only the cache
/// and the per-origin limiters.
pub struct TruthLayer {
    config: EngineConfig,
    handles: Vec<Arc<ModuleHandle>>,
    descriptors: Vec<ModuleDescriptor>,
    cache: Arc<MetricCache>,
    limiters: Arc<LimiterRegistry>,
}

impl TruthLayer {
    /// Start building an engine
    pub fn builder() -> TruthLayerBuilder {
        TruthLayerBuilder::new()
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered modules, in registration order
    pub fn describe(&self) -> &[ModuleDescriptor] {
        &self.descriptors
    }

    /// Shared metric cache
    pub fn cache(&self) -> Arc<MetricCache> {
        Arc::clone(&self.cache)
    }

    /// Cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Limiter statistics per origin
    pub fn limiter_stats(&self) -> Vec<(String, LimiterStats)> {
        self.limiters.stats()
    }

    /// Resolve a request to a single best answer
    ///
    /// Tiers are walked strictly in priority order. Module failures are
    /// recorded in the trace and never fail the request.
    ///
    /// # Errors
    ///
    /// [`EngineError::Cancelled`] if `cancel` fires and
    /// [`EngineError::RequestTimeout`] if the request deadline (the caller's,
    /// capped by `request_timeout_ms`) elapses;
    /// in-flight module calls are aborted in both cases.
    pub async fn resolve(
        &self,
        request: MetricRequest,
        cancel: &CancellationToken,
    ) -> Result<Resolution, EngineError> {
        request.validate()?;
        let deadline = match request.timeout() {
            Some(caller) => caller.min(self.config.request_timeout()),
            None => self.config.request_timeout(),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(identifier = %request.identifier.as_str(), metric = %request.metric, "Resolution cancelled");
                Err(EngineError::Cancelled)
            }
            result = tokio::time::timeout(deadline, self.walk_tiers(&request)) => {
                result.map_err(|_| {
                    tracing::warn!(identifier = %request.identifier.as_str(), metric = %request.metric, "Resolution timed out");
                    EngineError::RequestTimeout(deadline)
                })
            }
        }
    }

    async fn walk_tiers(&self, request: &MetricRequest) -> Resolution {
        let mut trace = ResolutionTrace::new();
        let mut below_threshold: Vec<Candidate> = Vec::new();
        let shared = Arc::new(request.clone());

        for tier in request.bounds.tiers() {
            let handles: Vec<_> = self
                .handles
                .iter()
                .filter(|h| h.module.tier() == tier)
                .cloned()
                .collect();
            if handles.is_empty() {
                continue;
            }

            let dispatches = self.fan_out(tier, handles, &shared).await;
            let threshold = self.config.thresholds.for_tier(tier);

            let mut acceptable = Vec::new();
            for dispatch in dispatches {
                trace.push(dispatch.entry);
                if let Some(metric) = dispatch.metric {
                    let candidate = Candidate::new(dispatch.index, metric);
                    match threshold {
                        Some(min) if !candidate.metric.confidence.meets(min) => {
                            below_threshold.push(candidate)
                        }
                        _ => acceptable.push(candidate),
                    }
                }
            }

            if let Some(best) = select_best(acceptable) {
                tracing::info!(
                    identifier = %request.identifier.as_str(),
                    metric = %request.metric,
                    tier = %tier,
                    source = %best.metric.source,
                    confidence = best.metric.confidence.value(),
                    "Metric resolved"
                );
                return Resolution {
                    outcome: ResolutionOutcome::Resolved { metric: best.metric },
                    trace,
                };
            }
            tracing::debug!(tier = %tier, "No acceptable result, falling through");
        }

        tracing::info!(
            identifier = %request.identifier.as_str(),
            metric = %request.metric,
            candidates = below_threshold.len(),
            "Metric unresolved"
        );
        Resolution {
            outcome: ResolutionOutcome::Unresolved {
                best_candidate: select_best(below_threshold).map(|c| c.metric),
            },
            trace,
        }
    }

    /// Run every module of one tier concurrently and collect all results
    ///
    /// Results come back sorted by registration index. Modules still running
    /// at the tier deadline are aborted and recorded as timed out.
    async fn fan_out(
        &self,
        tier: Tier,
        handles: Vec<Arc<ModuleHandle>>,
        request: &Arc<MetricRequest>,
    ) -> Vec<Dispatch> {
        let mut pending: BTreeSet<usize> = handles.iter().map(|h| h.index).collect();
        let mut set = JoinSet::new();
        for handle in &handles {
            let handle = Arc::clone(handle);
            let request = Arc::clone(request);
            set.spawn(async move { handle.dispatch(&request).await });
        }

        let started = tokio::time::Instant::now();
        let tier_deadline = started + self.config.tier_timeout();
        let mut results = Vec::with_capacity(handles.len());
        let mut tier_timed_out = false;

        loop {
            match tokio::time::timeout_at(tier_deadline, set.join_next()).await {
                Ok(Some(Ok(dispatch))) => {
                    pending.remove(&dispatch.index);
                    results.push(dispatch);
                }
                Ok(Some(Err(err))) => {
                    tracing::error!(tier = %tier, error = %err, "Module task failed");
                }
                Ok(None) => break,
                Err(_) => {
                    tier_timed_out = true;
                    set.abort_all();
                    break;
                }
            }
        }

        // Modules that never reported: aborted at the tier deadline or panicked
        for handle in handles.iter().filter(|h| pending.contains(&h.index)) {
            let outcome = if tier_timed_out {
                TraceOutcome::TimedOut
            } else {
                TraceOutcome::Error {
                    kind: "panicked".to_string(),
                    message: "module task terminated abnormally".to_string(),
                }
            };
            let elapsed = started.elapsed().as_millis() as u64;
            results.push(Dispatch {
                index: handle.index,
                metric: None,
                entry: TraceEntry::new(handle.name(), tier, outcome, elapsed),
            });
        }

        results.sort_by_key(|d| d.index);
        results
    }
}
