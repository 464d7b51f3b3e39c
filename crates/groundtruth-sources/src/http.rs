//! Generic JSON-over-HTTP source module
//!
//! Queries `GET {base_url}/{identifier}/{metric}?period={period}` and expects
//! a body like the one below. Identifier and metric are each sent as a
//! single percent-encoded path segment.
//!
//!
//! ```json
//! { "value": 100000000, "unit": "USD", "confidence": 0.97,
//!   "reference": "https://example.test/filing/123" }
//! ```
//!
//! `value` may also be `{"low": .., "high": ..}` or a string.

use crate::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use groundtruth_domain::{
    CacheClass, Confidence, EntityId, ExtractionMethod, FinancialMetric, Fingerprint, MetricValue,
    ModuleError, Provenance, RateBudget, SourceModule, SourceType, Tier,
};
use serde::Deserialize;
use std::time::Duration;

/// Default HTTP timeout (10 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Settings for an [`HttpJsonModule`]
#[derive(Debug, Clone)]
pub struct HttpJsonConfig {
    /// Module name
    pub name: String,
    /// Base URL of the origin
    pub base_url: String,
    /// Authority tier
    pub tier: Tier,
    /// Source type recorded in provenance
    pub source_type: SourceType,
    /// Confidence when the payload carries none
    pub confidence: Confidence,
    /// Declared outbound budget
    pub budget: RateBudget,
    /// Transport timeout
    pub timeout: Duration,
    /// Freshness class (defaults from tier)
    pub cache_class: Option<CacheClass>,
}

impl HttpJsonConfig {
    /// Settings with tier-appropriate defaults
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, tier: Tier) -> Self {
        let (source_type, confidence) = match tier {
            Tier::Tier1 => (SourceType::RegulatoryFiling, 0.95),
            Tier::Tier2 => (SourceType::MarketQuote, 0.75),
            Tier::Tier3 => (SourceType::IndustryBenchmark, 0.6),
        };
        Self {
            name: name.into(),
            base_url: base_url.into(),
            tier,
            source_type,
            confidence: Confidence::clamped(confidence),
            budget: RateBudget::per_second(5),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_class: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PayloadValue {
    Number(f64),
    Range { low: f64, high: f64 },
    Text(String),
}

#[derive(Debug, Deserialize)]
struct Payload {
    value: PayloadValue,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    as_of: Option<DateTime<Utc>>,
}

/// Map an HTTP status to a module error (`None` = success)
pub fn classify_status(status: u16) -> Option<ModuleError> {
    match status {
        200..=299 => None,
        404 => Some(ModuleError::NotFound),
        429 => Some(ModuleError::RateLimited),
        500..=599 => Some(ModuleError::Unavailable(format!("HTTP {status}"))),
        other => Some(ModuleError::Unavailable(format!("unexpected HTTP {other}"))),
    }
}

/// Source module for a JSON HTTP origin
///
/// The module never retries; transport failures surface as
/// [`ModuleError::Unavailable`] and the engine decides what to do.
pub struct HttpJsonModule {
    config: HttpJsonConfig,
    base: reqwest::Url,
    origin: String,
    client: reqwest::Client,
}

impl HttpJsonModule {
    /// Create a module with its own HTTP client
    pub fn new(config: HttpJsonConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;
        Self::with_client(config, client)
    }

    /// Create a module sharing an existing client
    pub fn with_client(config: HttpJsonConfig, client: reqwest::Client) -> Result<Self, SourceError> {
        let url = reqwest::Url::parse(&config.base_url)
            .map_err(|e| SourceError::InvalidConfig(format!("base_url '{}': {}", config.base_url, e)))?;
        let origin = url
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| SourceError::InvalidConfig(format!("base_url '{}' has no host", config.base_url)))?;
        Ok(Self {
            config,
            base: url,
            origin,
            client,
        })
    }

    /// Resource URL for one metric
    ///
    /// Dot segments cannot name an entity or a metric and are answered with
    /// [`ModuleError::NotFound`] without contacting the origin.
    fn url(
        &self,
        identifier: &EntityId,
        metric: &str,
        period: Option<&str>,
    ) -> Result<reqwest::Url, ModuleError> {
        for segment in [identifier.as_str(), metric] {
            if matches!(segment, "" | "." | "..") {
                tracing::debug!(module = %self.config.name, segment, "Unaddressable path segment");
                return Err(ModuleError::NotFound);
            }
        }

        let mut url = self.base.clone();
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(identifier.as_str()).push(metric);
        }
        if let Some(period) = period {
            url.query_pairs_mut().append_pair("period", period);
        }
        Ok(url)
    }

    /// Turn a response body into a metric
    pub fn parse_payload(
        &self,
        identifier: &EntityId,
        metric: &str,
        period: Option<&str>,
        body: &[u8],
    ) -> Result<FinancialMetric, ModuleError> {
        let payload: Payload = serde_json::from_slice(body).map_err(|e| {
            tracing::warn!(module = %self.config.name, error = %e, "Undecodable payload");
            ModuleError::Malformed(e.to_string())
        })?;

        let unit = payload.unit.unwrap_or_else(|| "USD".to_string());
        let value = match payload.value {
            PayloadValue::Number(amount) => MetricValue::scalar(amount, unit),
            PayloadValue::Range { low, high } => MetricValue::range(low, high, unit)
                .map_err(|e| ModuleError::Malformed(e.to_string()))?,
            PayloadValue::Text(text) => MetricValue::text(text),
        };
        let confidence = match payload.confidence {
            Some(c) => Confidence::new(c).map_err(|e| ModuleError::Malformed(e.to_string()))?,
            None => self.config.confidence,
        };

        let reference = match payload.reference {
            Some(reference) => reference,
            None => self.url(identifier, metric, period)?.to_string(),
        };
        let provenance = Provenance::new(
            self.config.source_type,
            ExtractionMethod::DirectField,
            Fingerprint::of(body),
        )
        .with_reference(reference);

        let result = FinancialMetric::new(
            identifier.clone(),
            metric,
            period.map(str::to_string),
            value,
            self.config.tier,
            confidence,
            self.config.name.as_str(),
            provenance,
        );
        Ok(match payload.as_of {
            Some(ts) => result.with_timestamp(ts),
            None => result,
        })
    }
}

#[async_trait]
impl SourceModule for HttpJsonModule {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn tier(&self) -> Tier {
        self.config.tier
    }

    fn rate_budget(&self) -> RateBudget {
        self.config.budget
    }

    fn origin(&self) -> &str {
        &self.origin
    }

    fn cache_class(&self) -> CacheClass {
        self.config
            .cache_class
            .unwrap_or_else(|| self.config.tier.default_cache_class())
    }

    async fn query(
        &self,
        identifier: &EntityId,
        metric: &str,
        period: Option<&str>,
    ) -> Result<FinancialMetric, ModuleError> {
        let url = self.url(identifier, metric, period)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ModuleError::Unavailable(format!("Request failed: {e}")))?;

        if let Some(err) = classify_status(response.status().as_u16()) {
            return Err(err);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ModuleError::Unavailable(format!("Failed to read body: {e}")))?;
        self.parse_payload(identifier, metric, period, &body)
    }
}
