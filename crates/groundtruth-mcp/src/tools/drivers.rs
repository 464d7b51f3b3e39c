//! Value-drivers tool - compare an entity's metric against its industry benchmark

use super::{required, ToolContext};
use crate::envelope::{engine_failure, Envelope, MetricAnswer};
use crate::McpError;
use groundtruth_domain::{Confidence, MetricRequest, ResolutionTrace, Tier, TierBounds};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// How the entity and benchmark values are compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverMode {
    /// benchmark − actual
    #[default]
    Gap,
    /// actual / benchmark
    Ratio,
}

/// Where the entity sits relative to the benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Entity outperforms the benchmark
    Above,
    /// Entity trails the benchmark
    Below,
    /// Entity matches the benchmark
    AtParity,
}

impl Direction {
    fn of(actual: f64, benchmark: f64) -> Self {
        let tolerance = f64::EPSILON * actual.abs().max(benchmark.abs()).max(1.0);
        if (actual - benchmark).abs() <= tolerance {
            Direction::AtParity
        } else if actual > benchmark {
            Direction::Above
        } else {
            Direction::Below
        }
    }
}

/// Parameters for a value-driver computation
#[derive(Debug, Deserialize)]
pub struct DriversParams {
    /// Target entity
    pub identifier: String,
    /// Entity metric to compare
    pub metric: String,
    /// Industry classification code of the benchmark
    pub classification_code: String,
    /// Benchmark metric (defaults to `metric`)
    #[serde(default)]
    pub benchmark_metric: Option<String>,
    /// Comparison mode (default: gap)
    #[serde(default)]
    pub mode: DriverMode,
    /// Reporting period
    #[serde(default)]
    pub period: Option<String>,
    /// Attach the resolution trace
    #[serde(default)]
    pub include_trace: bool,
}

/// Structured, advisory comparison result
#[derive(Debug, Clone, Serialize)]
pub struct DriverResult {
    /// Gap (benchmark − actual) or ratio (actual / benchmark)
    pub delta: f64,
    /// Comparison mode
    pub mode: DriverMode,
    /// Entity relative to benchmark
    pub direction: Direction,
    /// Unit of `delta` (`ratio` in ratio mode)
    pub unit: String,
    /// Entity value
    pub actual: MetricAnswer,
    /// Benchmark value
    pub benchmark: MetricAnswer,
    /// The weaker of the two input confidences
    pub confidence: Confidence,
    /// Always true: planning input, not a fact
    pub advisory: bool,
}

/// Errors that stop a comparison once both inputs are resolved
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CompareError {
    NotNumeric,
    UnitMismatch(String, String),
    ZeroBenchmark,
}

impl CompareError {
    fn kind(&self) -> &'static str {
        match self {
            CompareError::NotNumeric => "non_numeric",
            CompareError::UnitMismatch(..) => "unit_mismatch",
            CompareError::ZeroBenchmark => "zero_benchmark",
        }
    }

    fn message(&self) -> String {
        match self {
            CompareError::NotNumeric => "actual and benchmark must both be numeric".to_string(),
            CompareError::UnitMismatch(a, b) => format!("actual is in {a}, benchmark is in {b}"),
            CompareError::ZeroBenchmark => "benchmark is zero, ratio is undefined".to_string(),
        }
    }
}

/// Compute the driver result from two resolved answers
pub(crate) fn compute(
    mode: DriverMode,
    actual: MetricAnswer,
    benchmark: MetricAnswer,
) -> Result<DriverResult, CompareError> {
    let (Some(a), Some(b)) = (actual.amount(), benchmark.amount()) else {
        return Err(CompareError::NotNumeric);
    };
    let actual_unit = actual.metric.value.unit().unwrap_or_default().to_string();
    let benchmark_unit = benchmark.metric.value.unit().unwrap_or_default().to_string();
    if !actual_unit.eq_ignore_ascii_case(&benchmark_unit) {
        return Err(CompareError::UnitMismatch(actual_unit, benchmark_unit));
    }

    let (delta, unit) = match mode {
        DriverMode::Gap => (b - a, actual_unit),
        DriverMode::Ratio if b == 0.0 => return Err(CompareError::ZeroBenchmark),
        DriverMode::Ratio => (a / b, "ratio".to_string()),
    };

    Ok(DriverResult {
        delta,
        mode,
        direction: Direction::of(a, b),
        unit,
        confidence: actual.metric.confidence.min(benchmark.metric.confidence),
        actual,
        benchmark,
        advisory: true,
    })
}

/// Handle groundtruth_value_drivers tool invocation
///
/// The entity metric may come from any tier; the benchmark always comes
/// from Tier3 under the classification code.
pub async fn handle_value_drivers(
    ctx: &ToolContext,
    params: DriversParams,
    cancel: &CancellationToken,
) -> Result<Envelope<DriverResult>, McpError> {
    let identifier = required("identifier", &params.identifier)?;
    let metric = required("metric", &params.metric)?;
    let code = required("classification_code", &params.classification_code)?;
    let benchmark_metric = match &params.benchmark_metric {
        Some(name) => required("benchmark_metric", name)?,
        None => metric,
    };
    let include = params.include_trace;

    let mut actual_request = MetricRequest::new(identifier, metric).with_bounds(TierBounds::all());
    let mut benchmark_request =
        MetricRequest::new(code, benchmark_metric).with_bounds(TierBounds::only(Tier::Tier3));
    if let Some(period) = &params.period {
        actual_request = actual_request.for_period(period.as_str());
        benchmark_request = benchmark_request.for_period(period.as_str());
    }

    let mut trace = ResolutionTrace::new();
    let mut answers = Vec::with_capacity(2);
    for request in [actual_request, benchmark_request] {
        match ctx.engine().resolve(request, cancel).await {
            Ok(resolution) => {
                let answer = resolution.metric().cloned().map(MetricAnswer::accepted);
                trace.merge(resolution.trace);
                answers.push(answer);
            }
            Err(err) => return Ok(engine_failure(err)?.traced(trace, include)),
        }
    }

    let benchmark = answers.pop().flatten();
    let actual = answers.pop().flatten();
    let (actual, benchmark) = match (actual, benchmark) {
        (Some(actual), Some(benchmark)) => (actual, benchmark),
        (None, _) => {
            return Ok(Envelope::unresolved(None)
                .with_error("missing_actual", format!("No source has {metric} for {identifier}"))
                .traced(trace, include))
        }
        (_, None) => {
            return Ok(Envelope::unresolved(None)
                .with_error("missing_benchmark", format!("No benchmark {benchmark_metric} for {code}"))
                .traced(trace, include))
        }
    };

    match compute(params.mode, actual, benchmark) {
        Ok(result) => {
            tracing::info!(
                identifier = %identifier,
                metric = %metric,
                delta = result.delta,
                direction = ?result.direction,
                "Value drivers computed"
            );
            Ok(Envelope::ok(result).traced(trace, include))
        }
        Err(err) => Ok(Envelope::error(err.kind(), err.message()).traced(trace, include)),
    }
}
