//! Response envelope shared by every tool
//!
//! ```json
//! { "status": "ok" | "unresolved" | "error",
//!   "data": ...,
//!   "trace": { ... },            // only when include_trace was set
//!   "error": { "kind": ..., "message": ... } }
//! ```
//!
//! `data` is always present (possibly `null`) so a consumer can tell "no
//! answer" apart from a missing field.

use groundtruth_domain::{FinancialMetric, ResolutionTrace};
use groundtruth_engine::{EngineError, Resolution};
use serde::{Deserialize, Serialize};

/// Envelope status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The tool produced its answer
    Ok,
    /// No acceptable answer; `data` holds best-effort data, if any
    Unresolved,
    /// The tool could not answer; see `error`
    Error,
}

/// Machine-readable failure carried inside an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Short kind, e.g. `no_authoritative_data`
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl ErrorBody {
    /// Create an error body
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Tool response envelope
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    /// Outcome
    pub status: Status,
    /// Payload (null when there is nothing to report)
    pub data: Option<T>,
    /// Resolution trace, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<ResolutionTrace>,
    /// Failure details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> Envelope<T> {
    /// Successful answer
    pub fn ok(data: T) -> Self {
        Self {
            status: Status::Ok,
            data: Some(data),
            trace: None,
            error: None,
        }
    }

    /// No acceptable answer, with best-effort data if any
    pub fn unresolved(data: Option<T>) -> Self {
        Self {
            status: Status::Unresolved,
            data,
            trace: None,
            error: None,
        }
    }

    /// Failure
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            data: None,
            trace: None,
            error: Some(ErrorBody::new(kind, message)),
        }
    }

    /// Attach an explanation without changing the status
    pub fn with_error(mut self, kind: impl Into<String>, message: impl Into<String>) -> Self {
        self.error = Some(ErrorBody::new(kind, message));
        self
    }

    /// Attach the trace if the caller asked for it
    pub fn traced(mut self, trace: ResolutionTrace, include: bool) -> Self {
        if include {
            self.trace = Some(trace);
        }
        self
    }
}

/// Turn an engine failure into an envelope where the caller should see it
///
/// Request timeouts and cancellations are outcomes of this call and go in
/// the envelope; anything else is a server-level error.
pub fn engine_failure<T>(err: EngineError) -> Result<Envelope<T>, crate::McpError> {
    match err {
        EngineError::RequestTimeout(_) | EngineError::Cancelled => {
            Ok(Envelope::error(err.kind(), err.to_string()))
        }
        other => Err(other.into()),
    }
}

/// A metric as shown to tool callers
///
/// Tier3 answers are marked `contextual`; candidates that never met their
/// tier's threshold are marked `below_threshold`. Neither is ever presented
/// as a confident fact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricAnswer {
    /// The metric itself
    #[serde(flatten)]
    pub metric: FinancialMetric,
    /// Answer came from a contextual (Tier3) source
    pub contextual: bool,
    /// Answer did not meet its tier's threshold
    pub below_threshold: bool,
}

impl MetricAnswer {
    /// An answer the engine accepted
    pub fn accepted(metric: FinancialMetric) -> Self {
        Self {
            contextual: metric.is_advisory(),
            below_threshold: false,
            metric,
        }
    }

    /// The best candidate of an unresolved outcome
    pub fn candidate(metric: FinancialMetric) -> Self {
        Self {
            contextual: metric.is_advisory(),
            below_threshold: true,
            metric,
        }
    }

    /// Split a resolution into its answer (if resolved), its candidate (if
    /// not) and its trace
    pub fn from_resolution(resolution: Resolution) -> (Option<MetricAnswer>, ResolutionTrace) {
        let answer = match (resolution.metric(), resolution.best_candidate()) {
            (Some(metric), _) => Some(MetricAnswer::accepted(metric.clone())),
            (None, Some(candidate)) => Some(MetricAnswer::candidate(candidate.clone())),
            (None, None) => None,
        };
        (answer, resolution.trace)
    }

    /// Point estimate of the value
    pub fn amount(&self) -> Option<f64> {
        self.metric.value.as_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundtruth_domain::{
        Confidence, EntityId, ExtractionMethod, Fingerprint, MetricValue, Provenance, SourceType,
        Tier,
    };
    use std::time::Duration;

    fn metric(tier: Tier) -> FinancialMetric {
        FinancialMetric::new(
            EntityId::new("ACME-CIK-001"),
            "revenue_total",
            Some("FY2024".to_string()),
            MetricValue::scalar(100_000_000.0, "USD"),
            tier,
            Confidence::clamped(0.95),
            "sec-filings",
            Provenance::new(
                SourceType::RegulatoryFiling,
                ExtractionMethod::DirectField,
                Fingerprint::of(b"100000000"),
            ),
        )
    }

    #[test]
    fn test_ok_envelope_shape() {
        let envelope = Envelope::ok(MetricAnswer::accepted(metric(Tier::Tier1)));
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["data"]["tier"], "Tier1");
        assert_eq!(json["data"]["metric"], "revenue_total");
        assert_eq!(json["data"]["contextual"], false);
        assert_eq!(json["data"]["below_threshold"], false);
        assert!(json.get("trace").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_unresolved_keeps_null_data() {
        let envelope: Envelope<MetricAnswer> = Envelope::unresolved(None);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"], "unresolved");
        assert!(json["data"].is_null());
    }

    #[test]
    fn test_trace_only_when_requested() {
        let envelope: Envelope<()> = Envelope::ok(()).traced(ResolutionTrace::new(), false);
        assert!(envelope.trace.is_none());

        let envelope: Envelope<()> = Envelope::ok(()).traced(ResolutionTrace::new(), true);
        assert!(envelope.trace.is_some());
    }

    #[test]
    fn test_tier3_is_contextual() {
        let answer = MetricAnswer::accepted(metric(Tier::Tier3));
        assert!(answer.contextual);
        assert!(!answer.below_threshold);

        let candidate = MetricAnswer::candidate(metric(Tier::Tier2));
        assert!(!candidate.contextual);
        assert!(candidate.below_threshold);
    }

    #[test]
    fn test_engine_failure_mapping() {
        let envelope: Envelope<()> =
            engine_failure(EngineError::RequestTimeout(Duration::from_secs(20))).unwrap();
        assert_eq!(envelope.status, Status::Error);
        assert_eq!(envelope.error.unwrap().kind, "request_timeout");

        let envelope: Envelope<()> = engine_failure(EngineError::Cancelled).unwrap();
        assert_eq!(envelope.error.unwrap().kind, "cancelled");

        let err = engine_failure::<()>(EngineError::InvalidRequest("metric is empty".into()));
        assert_eq!(err.unwrap_err().error_code(), -32600);
    }
}
