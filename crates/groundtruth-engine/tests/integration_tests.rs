//! Integration tests for the Truth Layer
//!
//! These exercise full resolutions against seeded modules: tier precedence,
//! tie-breaking, caching, rate limiting, fallback and cancellation.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use groundtruth_domain::{
    Confidence, EntityId, FinancialMetric, MetricRequest, MetricValue, ModuleError, RateBudget,
    SourceModule, Tier, TierBounds, TraceOutcome,
};
use groundtruth_engine::{EngineConfig, EngineError, ModuleOverride, TruthLayer};
use groundtruth_limiter::LimiterConfig;
use groundtruth_sources::SeededModule;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ACME: &str = "ACME-CIK-001";

fn filings() -> SeededModule {
    SeededModule::filings("sec-filings").seed(
        ACME,
        "revenue_total",
        Some("FY2024"),
        MetricValue::scalar(100_000_000.0, "USD"),
    )
}

fn quotes(name: &str, amount: f64) -> SeededModule {
    SeededModule::market_quotes(name).seed(
        ACME,
        "revenue_total",
        Some("FY2024"),
        MetricValue::scalar(amount, "USD"),
    )
}

fn request() -> MetricRequest {
    MetricRequest::new(ACME, "revenue_total").for_period("FY2024")
}

async fn resolve(engine: &TruthLayer, request: MetricRequest) -> groundtruth_engine::Resolution {
    engine.resolve(request, &CancellationToken::new()).await.unwrap()
}

#[tokio::test]
async fn test_authoritative_lookup_scenario() {
    let engine = TruthLayer::builder().module(filings()).build().unwrap();
    let resolution = resolve(&engine, request().with_bounds(TierBounds::only(Tier::Tier1))).await;

    let metric = resolution.metric().unwrap();
    assert_eq!(metric.tier, Tier::Tier1);
    assert!(metric.confidence.value() >= 0.9);
    assert_eq!(metric.value.as_f64(), Some(100_000_000.0));
    assert_eq!(resolution.trace.count("hit"), 1);
}

#[tokio::test]
async fn test_tier_precedence() {
    let tier2 = quotes("quotes", 120_000_000.0);
    let tier2_calls = tier2.calls();
    let engine = TruthLayer::builder()
        .module(tier2)
        .module(filings())
        .build()
        .unwrap();

    let resolution = resolve(&engine, request()).await;
    let metric = resolution.metric().unwrap();
    assert_eq!(metric.tier, Tier::Tier1);
    assert_eq!(metric.source, "sec-filings");

    // Lower tiers are never consulted once Tier1 answers
    assert_eq!(tier2_calls.get(), 0);
    assert_eq!(resolution.trace.tiers_consulted(), vec![Tier::Tier1]);
}

#[tokio::test]
async fn test_deterministic_tie_break() {
    let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    for _ in 0..10 {
        let engine = TruthLayer::builder()
            .module(quotes("first", 1.0).with_timestamp(ts).with_latency(Duration::from_millis(5)))
            .module(quotes("second", 2.0).with_timestamp(ts))
            .build()
            .unwrap();
        let resolution = resolve(&engine, request()).await;
        assert_eq!(resolution.metric().unwrap().source, "first");
    }
}

#[tokio::test]
async fn test_tie_break_prefers_recent_timestamp() {
    let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let newer = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let engine = TruthLayer::builder()
        .module(quotes("first", 1.0).with_timestamp(older))
        .module(quotes("second", 2.0).with_timestamp(newer))
        .build()
        .unwrap();
    let resolution = resolve(&engine, request()).await;
    assert_eq!(resolution.metric().unwrap().source, "second");
}

#[tokio::test]
async fn test_cache_idempotence() {
    let module = filings();
    let calls = module.calls();
    let engine = TruthLayer::builder().module(module).build().unwrap();

    let first = resolve(&engine, request()).await;
    let second = resolve(&engine, request()).await;

    assert_eq!(first.metric(), second.metric());
    assert_eq!(first.trace.live_calls(), 1);
    assert_eq!(second.trace.live_calls(), 0);
    assert_eq!(second.trace.count("cache_hit"), 1);
    assert_eq!(calls.get(), 1);
    assert_eq!(engine.cache_stats().hits, 1);
}

#[tokio::test]
async fn test_rate_limiter_bound() {
    let mut module = SeededModule::market_quotes("quotes").with_budget(RateBudget::per_minute(2));
    for id in ["A", "B", "C"] {
        module = module.seed(id, "price", None, MetricValue::scalar(10.0, "USD"));
    }
    let calls = module.calls();
    let engine = TruthLayer::builder()
        .limiter_config(LimiterConfig { max_wait_ms: 10 })
        .module(module)
        .build()
        .unwrap();

    let mut throttled = 0;
    for id in ["A", "B", "C"] {
        let resolution = resolve(&engine, MetricRequest::new(id, "price")).await;
        throttled += resolution.trace.count("throttled");
    }

    assert_eq!(throttled, 1);
    assert_eq!(calls.get(), 2, "throttled request must not reach the origin");
    let stats = engine.limiter_stats();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].1.granted, 2);
    assert_eq!(stats[0].1.throttled, 1);
}

#[tokio::test]
async fn test_graceful_degradation() {
    let engine = TruthLayer::builder()
        .module(filings().failing(ModuleError::Unavailable("maintenance".to_string())))
        .module(quotes("quotes", 99_000_000.0))
        .build()
        .unwrap();

    let resolution = resolve(&engine, request()).await;
    let metric = resolution.metric().unwrap();
    assert_eq!(metric.tier, Tier::Tier2);
    assert_eq!(metric.source, "quotes");

    let tier1: Vec<_> = resolution.trace.entries_for("sec-filings").collect();
    assert_eq!(tier1.len(), 1);
    assert!(matches!(tier1[0].outcome, TraceOutcome::Error { ref kind, .. } if kind == "unavailable"));
}

#[tokio::test]
async fn test_full_unresolved() {
    let engine = TruthLayer::builder()
        .module(filings())
        .module(quotes("quotes", 1.0))
        .module(SeededModule::benchmarks("benchmarks"))
        .build()
        .unwrap();

    let resolution = resolve(&engine, MetricRequest::new("UNKNOWN-ENTITY", "revenue_total")).await;
    assert!(!resolution.is_resolved());
    assert!(resolution.best_candidate().is_none());
    assert_eq!(resolution.trace.count("miss"), 3);
}

#[tokio::test]
async fn test_below_threshold_is_never_resolved() {
    let weak = SeededModule::filings("weak-filings")
        .with_confidence(Confidence::new(0.6).unwrap())
        .seed(ACME, "revenue_total", Some("FY2024"), MetricValue::scalar(5.0, "USD"));
    let engine = TruthLayer::builder().module(weak).build().unwrap();

    let resolution = resolve(&engine, request()).await;
    assert!(!resolution.is_resolved());
    let candidate = resolution.best_candidate().unwrap();
    assert_eq!(candidate.tier, Tier::Tier1);
    assert_eq!(candidate.confidence.value(), 0.6);
}

#[tokio::test]
async fn test_below_threshold_falls_through_to_next_tier() {
    let weak = SeededModule::filings("weak-filings")
        .with_confidence(Confidence::new(0.6).unwrap())
        .seed(ACME, "revenue_total", Some("FY2024"), MetricValue::scalar(5.0, "USD"));
    let engine = TruthLayer::builder()
        .module(weak)
        .module(quotes("quotes", 7.0))
        .build()
        .unwrap();

    let resolution = resolve(&engine, request()).await;
    assert_eq!(resolution.metric().unwrap().tier, Tier::Tier2);
}

#[tokio::test]
async fn test_tier3_accepted_at_any_confidence() {
    let bench = SeededModule::benchmarks("benchmarks")
        .with_confidence(Confidence::new(0.2).unwrap())
        .seed("NAICS-5112", "revenue_per_employee", None, MetricValue::scalar(250_000.0, "USD"));
    let engine = TruthLayer::builder().module(bench).build().unwrap();

    let resolution = resolve(&engine, MetricRequest::new("NAICS-5112", "revenue_per_employee")).await;
    let metric = resolution.metric().unwrap();
    assert!(metric.is_advisory());
}

#[tokio::test]
async fn test_tier_floor_excludes_lower_tiers() {
    let engine = TruthLayer::builder()
        .module(quotes("quotes", 1.0))
        .build()
        .unwrap();
    let resolution = resolve(&engine, request().with_bounds(TierBounds::only(Tier::Tier1))).await;
    assert!(!resolution.is_resolved());
    assert!(resolution.trace.entries.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_module_times_out_and_falls_through() {
    let config = EngineConfig {
        module_timeout_ms: 500,
        ..Default::default()
    };
    let engine = TruthLayer::builder()
        .config(config)
        .module(filings().with_latency(Duration::from_secs(30)))
        .module(quotes("quotes", 2.0))
        .build()
        .unwrap();

    let resolution = resolve(&engine, request()).await;
    assert_eq!(resolution.metric().unwrap().tier, Tier::Tier2);
    assert_eq!(resolution.trace.count("timed_out"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tier_deadline_aborts_modules_waiting_for_tokens() {
    // Two Tier1 modules behind one origin that grants a token every 1.5s
    let budget = RateBudget::new(1, Duration::from_millis(1_500));
    let shared = |name: &str| {
        SeededModule::filings(name)
            .with_origin("edgar")
            .with_budget(budget)
            .with_latency(Duration::from_millis(100))
            .seed(ACME, "revenue_total", Some("FY2024"), MetricValue::scalar(100_000_000.0, "USD"))
    };
    let config = EngineConfig {
        module_timeout_ms: 500,
        tier_timeout_ms: 1_000,
        ..Default::default()
    };
    let engine = TruthLayer::builder()
        .config(config)
        .limiter_config(LimiterConfig { max_wait_ms: 2_000 })
        .module(shared("filings-a"))
        .module(shared("filings-b"))
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    let resolution = resolve(&engine, request()).await;
    let elapsed = started.elapsed();

    assert_eq!(resolution.metric().unwrap().tier, Tier::Tier1);
    assert_eq!(resolution.trace.count("hit"), 1);
    assert_eq!(resolution.trace.count("timed_out"), 1);
    assert_eq!(resolution.trace.live_calls(), 1);

    let aborted = resolution
        .trace
        .entries
        .iter()
        .find(|e| e.outcome == TraceOutcome::TimedOut)
        .unwrap();
    assert_eq!(aborted.latency_ms, 1_000);
    assert!(elapsed < Duration::from_millis(1_500), "tier must not wait for the token");
}

#[tokio::test(start_paused = true)]
async fn test_caller_deadline_times_out_request() {
    let engine = TruthLayer::builder()
        .module(filings().with_latency(Duration::from_secs(30)))
        .module(quotes("quotes", 2.0).with_latency(Duration::from_secs(30)))
        .build()
        .unwrap();

    let result = engine
        .resolve(
            request().with_timeout(Duration::from_millis(300)),
            &CancellationToken::new(),
        )
        .await;
    assert!(matches!(
        result,
        Err(EngineError::RequestTimeout(d)) if d == Duration::from_millis(300)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_caller_deadline_longer_than_resolution() {
    let engine = TruthLayer::builder()
        .module(filings().with_latency(Duration::from_millis(50)))
        .build()
        .unwrap();

    let resolution = resolve(&engine, request().with_timeout(Duration::from_secs(3_600))).await;
    assert!(resolution.is_resolved());
}

#[tokio::test]
async fn test_unbounded_ttl_override_still_caches() {
    let mut config = EngineConfig::default();
    config.modules.insert(
        "sec-filings".to_string(),
        ModuleOverride {
            ttl_secs: Some(u64::MAX),
            ..Default::default()
        },
    );
    let engine = TruthLayer::builder().config(config).module(filings()).build().unwrap();

    let first = resolve(&engine, request()).await;
    assert_eq!(first.metric().unwrap().tier, Tier::Tier1);
    assert_eq!(first.trace.count("hit"), 1);

    let second = resolve(&engine, request()).await;
    assert_eq!(second.trace.count("cache_hit"), 1);
    assert_eq!(first.metric(), second.metric());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_aborts_resolution() {
    let engine = TruthLayer::builder()
        .module(filings().with_latency(Duration::from_secs(1)))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = engine.resolve(request(), &cancel).await;
    assert!(matches!(result, Err(EngineError::Cancelled)));
}

#[tokio::test]
async fn test_invalid_request() {
    let engine = TruthLayer::builder().module(filings()).build().unwrap();
    let result = engine
        .resolve(MetricRequest::new("", "revenue_total"), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(EngineError::InvalidRequest(_))));
}

#[test]
fn test_build_without_modules() {
    assert!(matches!(TruthLayer::builder().build(), Err(EngineError::NoModules)));
}

#[test]
fn test_duplicate_module_names() {
    let result = TruthLayer::builder().module(filings()).module(filings()).build();
    assert!(matches!(result, Err(EngineError::Registration(_))));
}

#[test]
fn test_describe() {
    let engine = TruthLayer::builder()
        .module(filings())
        .module(quotes("quotes", 1.0).with_origin("exchange"))
        .build()
        .unwrap();

    let modules = engine.describe();
    assert_eq!(modules.len(), 2);
    assert_eq!(modules[0].name, "sec-filings");
    assert_eq!(modules[0].tier, Tier::Tier1);
    assert_eq!(modules[0].cache_class, "regulatory");
    assert_eq!(modules[1].origin, "exchange");
}

/// Fails with `Unavailable` a fixed number of times, then answers
struct Flaky {
    failures: u32,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl SourceModule for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    fn tier(&self) -> Tier {
        Tier::Tier1
    }

    fn rate_budget(&self) -> RateBudget {
        RateBudget::per_second(100)
    }

    async fn query(
        &self,
        identifier: &EntityId,
        metric: &str,
        period: Option<&str>,
    ) -> Result<FinancialMetric, ModuleError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(ModuleError::Unavailable("blip".to_string()));
        }
        SeededModule::filings("flaky")
            .seed(identifier.as_str(), metric, period, MetricValue::scalar(1.0, "USD"))
            .query(identifier, metric, period)
            .await
    }
}

#[tokio::test]
async fn test_unavailable_is_retried_when_configured() {
    let calls = Arc::new(AtomicU32::new(0));
    let config = EngineConfig {
        module_retries: 1,
        ..Default::default()
    };
    let engine = TruthLayer::builder()
        .config(config)
        .module(Flaky {
            failures: 1,
            calls: Arc::clone(&calls),
        })
        .build()
        .unwrap();

    let resolution = resolve(&engine, request()).await;
    assert!(resolution.is_resolved());
    assert_eq!(resolution.trace.live_calls(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let calls = Arc::new(AtomicU32::new(0));
    let engine = TruthLayer::builder()
        .module(Flaky {
            failures: 1,
            calls: Arc::clone(&calls),
        })
        .build()
        .unwrap();

    let resolution = resolve(&engine, request()).await;
    assert!(!resolution.is_resolved());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Declares Tier1 but labels its answers Tier2
struct Mislabelled;

#[async_trait]
impl SourceModule for Mislabelled {
    fn name(&self) -> &str {
        "mislabelled"
    }

    fn tier(&self) -> Tier {
        Tier::Tier1
    }

    fn rate_budget(&self) -> RateBudget {
        RateBudget::per_second(100)
    }

    async fn query(
        &self,
        identifier: &EntityId,
        metric: &str,
        period: Option<&str>,
    ) -> Result<FinancialMetric, ModuleError> {
        SeededModule::market_quotes("x")
            .with_confidence(Confidence::CERTAIN)
            .seed(identifier.as_str(), metric, period, MetricValue::scalar(1.0, "USD"))
            .query(identifier, metric, period)
            .await
    }
}

#[tokio::test]
async fn test_mislabelled_result_is_rejected() {
    let engine = TruthLayer::builder().module(Mislabelled).build().unwrap();
    let resolution = resolve(&engine, request()).await;
    assert!(!resolution.is_resolved());
    assert_eq!(resolution.trace.count("error"), 1);
}
