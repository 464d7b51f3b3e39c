//! Financial metric - the value type every component produces

use crate::{Confidence, DomainError, Provenance, Tier, TierBounds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque identifier of the entity a query is about
///
/// May be a regulatory filer ID, a ticker symbol, a domain name or a
/// classification code. Identity is never resolved across kinds; callers
/// supply the identifier appropriate for the tier they target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create an identifier
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Metric value tagged with its shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MetricValue {
    /// A single number
    Scalar {
        /// The number
        amount: f64,
        /// Unit tag (e.g. "USD", "count", "ratio")
        unit: String,
    },
    /// A bounded range
    Range {
        /// Lower bound
        low: f64,
        /// Upper bound
        high: f64,
        /// Unit tag
        unit: String,
    },
    /// Free text
    Text {
        /// The text
        text: String,
    },
}

impl MetricValue {
    /// Scalar value
    pub fn scalar(amount: f64, unit: impl Into<String>) -> Self {
        MetricValue::Scalar {
            amount,
            unit: unit.into(),
        }
    }

    /// Range value, rejecting `low > high`
    pub fn range(low: f64, high: f64, unit: impl Into<String>) -> Result<Self, DomainError> {
        if low > high {
            return Err(DomainError::InvalidRange { low, high });
        }
        Ok(MetricValue::Range {
            low,
            high,
            unit: unit.into(),
        })
    }

    /// Text value
    pub fn text(text: impl Into<String>) -> Self {
        MetricValue::Text { text: text.into() }
    }

    /// Point estimate: the scalar itself, or a range midpoint
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Scalar { amount, .. } => Some(*amount),
            MetricValue::Range { low, high, .. } => Some((low + high) / 2.0),
            MetricValue::Text { .. } => None,
        }
    }

    /// Unit tag, if numeric
    pub fn unit(&self) -> Option<&str> {
        match self {
            MetricValue::Scalar { unit, .. } | MetricValue::Range { unit, .. } => Some(unit),
            MetricValue::Text { .. } => None,
        }
    }

    /// Shape name
    pub fn shape(&self) -> &'static str {
        match self {
            MetricValue::Scalar { .. } => "scalar",
            MetricValue::Range { .. } => "range",
            MetricValue::Text { .. } => "text",
        }
    }

    /// Multiply a numeric value by `other`, producing a value in `unit`
    ///
    /// Range × Range multiplies bound-wise; any text operand yields `None`.
    pub fn multiply(&self, other: &MetricValue, unit: impl Into<String>) -> Option<MetricValue> {
        let unit = unit.into();
        let (a_low, a_high) = self.bounds()?;
        let (b_low, b_high) = other.bounds()?;
        let low = a_low * b_low;
        let high = a_high * b_high;
        if self.shape() == "scalar" && other.shape() == "scalar" {
            Some(MetricValue::Scalar { amount: low, unit })
        } else {
            Some(MetricValue::Range {
                low: low.min(high),
                high: low.max(high),
                unit,
            })
        }
    }

    fn bounds(&self) -> Option<(f64, f64)> {
        match self {
            MetricValue::Scalar { amount, .. } => Some((*amount, *amount)),
            MetricValue::Range { low, high, .. } => Some((*low, *high)),
            MetricValue::Text { .. } => None,
        }
    }
}

/// A resolved financial metric with full provenance
///
/// Immutable once built; a newer answer replaces it rather than mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetric {
    /// Entity the value describes
    pub identifier: EntityId,

    /// Metric name (e.g. "revenue_total")
    pub metric: String,

    /// Reporting period (e.g. "FY2024"), if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,

    /// The value
    pub value: MetricValue,

    /// Authority tier of the origin
    pub tier: Tier,

    /// Confidence score
    pub confidence: Confidence,

    /// Human-readable origin name
    pub source: String,

    /// Resolution time (UTC)
    pub timestamp: DateTime<Utc>,

    /// Structured provenance
    pub provenance: Provenance,
}

impl FinancialMetric {
    /// Create a metric stamped with the current time
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identifier: EntityId,
        metric: impl Into<String>,
        period: Option<String>,
        value: MetricValue,
        tier: Tier,
        confidence: Confidence,
        source: impl Into<String>,
        provenance: Provenance,
    ) -> Self {
        Self {
            identifier,
            metric: metric.into(),
            period,
            value,
            tier,
            confidence,
            source: source.into(),
            timestamp: Utc::now(),
            provenance,
        }
    }

    /// Override the resolution timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether this answer is contextual only (Tier3)
    pub fn is_advisory(&self) -> bool {
        self.tier.is_advisory()
    }
}

/// Request for one metric of one entity
///
/// Constructed per call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRequest {
    /// Entity the request is about
    pub identifier: EntityId,

    /// Metric name
    pub metric: String,

    /// Reporting period
    #[serde(default)]
    pub period: Option<String>,

    /// Tiers the request may be answered from
    #[serde(default)]
    pub bounds: TierBounds,

    /// Caller's own deadline (ms); the engine ceiling still applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl MetricRequest {
    /// Request across all tiers
    pub fn new(identifier: impl Into<EntityId>, metric: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            metric: metric.into(),
            period: None,
            bounds: TierBounds::all(),
            timeout_ms: None,
        }
    }

    /// Restrict to a reporting period
    pub fn for_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    /// Restrict the tiers consulted
    pub fn with_bounds(mut self, bounds: TierBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Give up after `timeout` even if the engine would wait longer
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Caller deadline, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Check the request is answerable at all
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.identifier.as_str().trim().is_empty() {
            return Err(DomainError::InvalidRequest("identifier is empty".to_string()));
        }
        if self.metric.trim().is_empty() {
            return Err(DomainError::InvalidRequest("metric is empty".to_string()));
        }
        if self.timeout_ms == Some(0) {
            return Err(DomainError::InvalidRequest("timeout must be greater than 0".to_string()));
        }
        if !self.bounds.is_valid() {
            return Err(DomainError::InvalidRequest(format!(
                "tier ceiling {} is below floor {}",
                self.bounds.ceiling, self.bounds.floor
            )));
        }
        Ok(())
    }
}
