//! In-memory source modules backed by seeded fact tables
//!
//! Used for reference deployments and tests: regulatory filings (Tier1),
//! live quotes and private-company signals (Tier2) and industry benchmarks
//! keyed by classification code (Tier3).

use crate::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use groundtruth_domain::{
    CacheClass, Confidence, EntityId, ExtractionMethod, FinancialMetric, Fingerprint, MetricValue,
    ModuleError, Provenance, RateBudget, SourceModule, SourceType, Tier,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Preset shapes for seeded modules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedProfile {
    /// Tier1 regulatory filings
    Filings,
    /// Tier2 live market quotes
    MarketQuotes,
    /// Tier2 private-company signals (headcount, funding)
    PrivateEstimates,
    /// Tier3 industry benchmarks keyed by classification code
    Benchmarks,
}

impl SeedProfile {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SeedProfile::Filings => "filings",
            SeedProfile::MarketQuotes => "market_quotes",
            SeedProfile::PrivateEstimates => "private_estimates",
            SeedProfile::Benchmarks => "benchmarks",
        }
    }

    /// Build an empty module with this profile
    pub fn build(&self, name: impl Into<String>) -> SeededModule {
        match self {
            SeedProfile::Filings => SeededModule::filings(name),
            SeedProfile::MarketQuotes => SeededModule::market_quotes(name),
            SeedProfile::PrivateEstimates => SeededModule::private_estimates(name),
            SeedProfile::Benchmarks => SeededModule::benchmarks(name),
        }
    }
}

impl FromStr for SeedProfile {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "filings" => Ok(SeedProfile::Filings),
            "market_quotes" | "quotes" => Ok(SeedProfile::MarketQuotes),
            "private_estimates" | "estimates" => Ok(SeedProfile::PrivateEstimates),
            "benchmarks" => Ok(SeedProfile::Benchmarks),
            other => Err(SourceError::UnknownProfile(other.to_string())),
        }
    }
}

/// Shared view of how many live queries a module has served
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicU32>);

impl CallCounter {
    /// Current count
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FactKey {
    identifier: String,
    metric: String,
    period: Option<String>,
}

#[derive(Debug, Clone)]
struct SeededFact {
    value: MetricValue,
    confidence: Option<Confidence>,
}

/// Source module answering from a fixed fact table
///
/// The table is fixed at construction, so the module holds no state across
/// calls apart from its call counter.
///
/// # Examples
///
/// ```
/// use groundtruth_domain::{EntityId, MetricValue, SourceModule, Tier};
/// use groundtruth_sources::SeededModule;
///
/// # #[tokio::main]
/// # async fn main() {
/// let module = SeededModule::filings("sec-filings").seed(
///     "ACME-CIK-001",
///     "revenue_total",
///     Some("FY2024"),
///     MetricValue::scalar(100_000_000.0, "USD"),
/// );
///
/// let metric = module
///     .query(&EntityId::new("ACME-CIK-001"), "revenue_total", Some("FY2024"))
///     .await
///     .unwrap();
/// assert_eq!(metric.tier, Tier::Tier1);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SeededModule {
    name: String,
    origin: Option<String>,
    tier: Tier,
    source_type: SourceType,
    method: ExtractionMethod,
    cache_class: CacheClass,
    confidence: Confidence,
    budget: RateBudget,
    facts: HashMap<FactKey, SeededFact>,
    latency: Option<Duration>,
    failure: Option<ModuleError>,
    timestamp: Option<DateTime<Utc>>,
    calls: CallCounter,
}

impl SeededModule {
    /// Create an empty module with explicit settings
    pub fn new(
        name: impl Into<String>,
        tier: Tier,
        source_type: SourceType,
        confidence: Confidence,
    ) -> Self {
        Self {
            name: name.into(),
            origin: None,
            tier,
            source_type,
            method: ExtractionMethod::DirectField,
            cache_class: tier.default_cache_class(),
            confidence,
            budget: RateBudget::per_second(10),
            facts: HashMap::new(),
            latency: None,
            failure: None,
            timestamp: None,
            calls: CallCounter::default(),
        }
    }

    /// Tier1 regulatory filings (confidence 0.95, never expires)
    pub fn filings(name: impl Into<String>) -> Self {
        Self::new(name, Tier::Tier1, SourceType::RegulatoryFiling, Confidence::clamped(0.95))
    }

    /// Tier2 live market quotes (confidence 0.8, short TTL)
    pub fn market_quotes(name: impl Into<String>) -> Self {
        Self::new(name, Tier::Tier2, SourceType::MarketQuote, Confidence::clamped(0.8))
            .with_budget(RateBudget::per_second(5))
            .with_cache_class(CacheClass::LiveMarket)
    }

    /// Tier2 private-company signals (confidence 0.7, long TTL)
    pub fn private_estimates(name: impl Into<String>) -> Self {
        let mut module = Self::new(
            name,
            Tier::Tier2,
            SourceType::PrivateEstimate,
            Confidence::clamped(0.7),
        )
        .with_budget(RateBudget::per_minute(60))
        .with_cache_class(CacheClass::Estimated);
        module.method = ExtractionMethod::Inferred;
        module
    }

    /// Tier3 industry benchmarks keyed by classification code (confidence 0.7)
    pub fn benchmarks(name: impl Into<String>) -> Self {
        let mut module = Self::new(
            name,
            Tier::Tier3,
            SourceType::IndustryBenchmark,
            Confidence::clamped(0.7),
        )
        .with_budget(RateBudget::per_minute(60))
        .with_cache_class(CacheClass::Benchmark);
        module.method = ExtractionMethod::Computed;
        module
    }

    /// Add a fact at the module's default confidence
    pub fn seed(
        mut self,
        identifier: impl Into<String>,
        metric: impl Into<String>,
        period: Option<&str>,
        value: MetricValue,
    ) -> Self {
        self.insert(identifier.into(), metric.into(), period, value, None);
        self
    }

    /// Add a fact with its own confidence
    pub fn seed_with_confidence(
        mut self,
        identifier: impl Into<String>,
        metric: impl Into<String>,
        period: Option<&str>,
        value: MetricValue,
        confidence: Confidence,
    ) -> Self {
        self.insert(identifier.into(), metric.into(), period, value, Some(confidence));
        self
    }

    fn insert(
        &mut self,
        identifier: String,
        metric: String,
        period: Option<&str>,
        value: MetricValue,
        confidence: Option<Confidence>,
    ) {
        let key = FactKey {
            identifier,
            metric,
            period: period.map(str::to_string),
        };
        self.facts.insert(key, SeededFact { value, confidence });
    }

    /// Default confidence for seeded facts
    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    /// Rate budget declared to the engine
    pub fn with_budget(mut self, budget: RateBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Share a rate-limit origin with other modules
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Freshness class
    pub fn with_cache_class(mut self, class: CacheClass) -> Self {
        self.cache_class = class;
        self
    }

    /// Simulated origin latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every query fail with `error`
    pub fn failing(mut self, error: ModuleError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Stamp results with a fixed time instead of now
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Counter of live queries served, shared with clones
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }

    /// Number of seeded facts
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether no facts are seeded
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Exact period first; a period-less fact answers any period
    fn lookup(&self, identifier: &str, metric: &str, period: Option<&str>) -> Option<&SeededFact> {
        let exact = FactKey {
            identifier: identifier.to_string(),
            metric: metric.to_string(),
            period: period.map(str::to_string),
        };
        self.facts.get(&exact).or_else(|| {
            period?;
            self.facts.get(&FactKey { period: None, ..exact })
        })
    }
}

#[async_trait]
impl SourceModule for SeededModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    fn rate_budget(&self) -> RateBudget {
        self.budget
    }

    fn origin(&self) -> &str {
        self.origin.as_deref().unwrap_or(&self.name)
    }

    fn cache_class(&self) -> CacheClass {
        self.cache_class
    }

    async fn query(
        &self,
        identifier: &EntityId,
        metric: &str,
        period: Option<&str>,
    ) -> Result<FinancialMetric, ModuleError> {
        self.calls.increment();
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        let fact = self
            .lookup(identifier.as_str(), metric, period)
            .ok_or(ModuleError::NotFound)?;

        let raw = serde_json::to_vec(&fact.value).map_err(|e| ModuleError::Malformed(e.to_string()))?;
        let fingerprint = Fingerprint::of(&raw);
        let provenance = Provenance::new(self.source_type, self.method, fingerprint).with_reference(
            format!("seed://{}/{}/{}", self.name, identifier.as_str(), metric),
        );

        let result = FinancialMetric::new(
            identifier.clone(),
            metric,
            period.map(str::to_string),
            fact.value.clone(),
            self.tier,
            fact.confidence.unwrap_or(self.confidence),
            self.name.as_str(),
            provenance,
        );
        Ok(match self.timestamp {
            Some(ts) => result.with_timestamp(ts),
            None => result,
        })
    }
}
