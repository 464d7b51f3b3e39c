//! Lookup tool - authoritative metric lookup

use super::{parse_tier, required, ToolContext};
use crate::envelope::{engine_failure, Envelope, ErrorBody, MetricAnswer, Status};
use crate::McpError;
use groundtruth_domain::{MetricRequest, ResolutionTrace, Tier, TierBounds};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Error kind when a Tier1-only lookup finds nothing acceptable
pub const NO_AUTHORITATIVE_DATA: &str = "no_authoritative_data";

/// Parameters for a lookup
#[derive(Debug, Deserialize)]
pub struct LookupParams {
    /// Entity identifier
    pub identifier: String,
    /// Single metric
    #[serde(default)]
    pub metric: Option<String>,
    /// Several metrics, resolved independently
    #[serde(default)]
    pub metrics: Option<Vec<String>>,
    /// Reporting period
    #[serde(default)]
    pub period: Option<String>,
    /// Least authoritative tier accepted (default: Tier1)
    #[serde(default)]
    pub tier_floor: Option<String>,
    /// Attach the resolution trace
    #[serde(default)]
    pub include_trace: bool,
}

/// One metric of a batch lookup
#[derive(Debug, Clone, Serialize)]
pub struct LookupItem {
    /// Metric name
    pub metric: String,
    /// Outcome for this metric
    pub status: Status,
    /// Answer or best-effort candidate
    pub data: Option<MetricAnswer>,
    /// Failure details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Lookup payload: one answer, or one item per requested metric
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LookupData {
    /// Single-metric lookup
    One(MetricAnswer),
    /// Batch lookup
    Many(Vec<LookupItem>),
}

struct Outcome {
    status: Status,
    answer: Option<MetricAnswer>,
    error: Option<ErrorBody>,
}

fn classify(answer: Option<MetricAnswer>, floor: Tier, identifier: &str, metric: &str) -> Outcome {
    match answer {
        Some(answer) if !answer.below_threshold => Outcome {
            status: Status::Ok,
            answer: Some(answer),
            error: None,
        },
        candidate if floor == Tier::Tier1 => Outcome {
            status: Status::Error,
            answer: candidate,
            error: Some(ErrorBody::new(
                NO_AUTHORITATIVE_DATA,
                format!("No Tier1 source has {metric} for {identifier}"),
            )),
        },
        candidate => Outcome {
            status: Status::Unresolved,
            answer: candidate,
            error: None,
        },
    }
}

/// Handle groundtruth_lookup tool invocation
///
/// Resolves each requested metric from Tier1 down to `tier_floor`. A
/// Tier1-only lookup that finds nothing reports `no_authoritative_data`;
/// a wider lookup reports `unresolved`. Either way any below-threshold
/// candidate is returned marked as such, never as a confident answer.
pub async fn handle_lookup(
    ctx: &ToolContext,
    params: LookupParams,
    cancel: &CancellationToken,
) -> Result<Envelope<LookupData>, McpError> {
    let identifier = required("identifier", &params.identifier)?.to_string();
    let floor = match &params.tier_floor {
        Some(label) => parse_tier(label)?,
        None => Tier::Tier1,
    };

    let (metrics, batch) = match (params.metric, params.metrics) {
        (Some(metric), None) => (vec![metric], false),
        (None, Some(metrics)) if !metrics.is_empty() => (metrics, true),
        (None, Some(_)) => return Err(McpError::InvalidRequest("metrics is empty".to_string())),
        (None, None) => return Err(McpError::InvalidRequest("metric or metrics is required".to_string())),
        (Some(_), Some(_)) => {
            return Err(McpError::InvalidRequest("use either metric or metrics, not both".to_string()))
        }
    };

    let mut trace = ResolutionTrace::new();
    let mut items = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let metric = required("metric", &metric)?.to_string();
        let mut request = MetricRequest::new(identifier.as_str(), metric.as_str())
            .with_bounds(TierBounds::at_least(floor));
        if let Some(period) = &params.period {
            request = request.for_period(period.as_str());
        }

        let resolution = match ctx.engine().resolve(request, cancel).await {
            Ok(resolution) => resolution,
            Err(err) => return Ok(engine_failure(err)?.traced(trace, params.include_trace)),
        };
        let (answer, metric_trace) = MetricAnswer::from_resolution(resolution);
        trace.merge(metric_trace);

        let outcome = classify(answer, floor, &identifier, &metric);
        tracing::info!(
            identifier = %identifier,
            metric = %metric,
            status = ?outcome.status,
            "Lookup resolved"
        );
        items.push(LookupItem {
            metric,
            status: outcome.status,
            data: outcome.answer,
            error: outcome.error,
        });
    }

    let (status, data, error) = if batch {
        let status = if items.iter().all(|i| i.status == Status::Ok) {
            Status::Ok
        } else if floor == Tier::Tier1 && items.iter().all(|i| i.status == Status::Error) {
            Status::Error
        } else {
            Status::Unresolved
        };
        let error = (status == Status::Error)
            .then(|| ErrorBody::new(NO_AUTHORITATIVE_DATA, "No Tier1 source has any requested metric"));
        (status, Some(LookupData::Many(items)), error)
    } else {
        let item = items
            .pop()
            .ok_or_else(|| McpError::InvalidRequest("metric is required".to_string()))?;
        (item.status, item.data.map(LookupData::One), item.error)
    };

    let envelope = Envelope {
        status,
        data,
        trace: None,
        error,
    };
    Ok(envelope.traced(trace, params.include_trace))
}
