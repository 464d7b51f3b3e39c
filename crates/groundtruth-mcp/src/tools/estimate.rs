//! Estimate tool - private-company revenue from proxy signals
//!
//! revenue_estimate = proxy signal × industry benchmark multiplier
//!
//! The proxy (headcount or total funding) is resolved from Tier2 down to
//! Tier3; the multiplier always comes from a Tier3 benchmark keyed by the
//! entity's classification code. The estimate is labelled Tier2 and its
//! confidence is the product of both inputs, capped at the Tier2 band.

use super::{required, ToolContext};
use crate::envelope::{engine_failure, Envelope, MetricAnswer};
use crate::McpError;
use groundtruth_domain::{
    ExtractionMethod, FinancialMetric, Fingerprint, MetricRequest, Provenance,
    ResolutionTrace, SourceType, Tier, TierBounds,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Metric name of the estimate
pub const ESTIMATE_METRIC: &str = "revenue_estimate";

/// Source name recorded on estimates
pub const ESTIMATOR_SOURCE: &str = "groundtruth-estimator";

/// Proxy signal the estimate is scaled from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyKind {
    /// Number of employees
    #[default]
    Headcount,
    /// Total funding raised
    FundingTotal,
}

impl ProxyKind {
    /// Metric name of the proxy signal
    pub fn metric(&self) -> &'static str {
        match self {
            ProxyKind::Headcount => "headcount",
            ProxyKind::FundingTotal => "funding_total",
        }
    }

    /// Benchmark metric that converts the proxy into revenue
    pub fn benchmark_metric(&self) -> &'static str {
        match self {
            ProxyKind::Headcount => "revenue_per_employee",
            ProxyKind::FundingTotal => "revenue_per_funding_dollar",
        }
    }

    /// Unit of the estimate: the monetary operand's unit
    fn estimate_unit(&self, proxy: &FinancialMetric, benchmark: &FinancialMetric) -> String {
        let monetary = match self {
            ProxyKind::Headcount => benchmark,
            ProxyKind::FundingTotal => proxy,
        };
        monetary.value.unit().unwrap_or("USD").to_string()
    }
}

/// Parameters for an estimate
#[derive(Debug, Deserialize)]
pub struct EstimateParams {
    /// Private entity identifier
    pub identifier: String,
    /// Industry classification code the benchmarks are keyed by
    pub classification_code: String,
    /// Proxy signal (default: headcount)
    #[serde(default)]
    pub proxy: ProxyKind,
    /// Reporting period
    #[serde(default)]
    pub period: Option<String>,
    /// Attach the resolution trace
    #[serde(default)]
    pub include_trace: bool,
}

/// Estimate with the inputs it was computed from
#[derive(Debug, Clone, Serialize)]
pub struct EstimateResult {
    /// The derived revenue estimate (Tier2)
    pub estimate: MetricAnswer,
    /// Proxy signal used
    pub proxy: MetricAnswer,
    /// Benchmark multiplier used
    pub benchmark: MetricAnswer,
    /// How the estimate was computed, e.g. `headcount × revenue_per_employee`
    pub formula: String,
}

/// Combine a proxy signal and a benchmark multiplier into an estimate
///
/// Returns `None` if either value is not numeric.
pub fn derive_estimate(
    proxy_kind: ProxyKind,
    proxy: &FinancialMetric,
    benchmark: &FinancialMetric,
) -> Option<FinancialMetric> {
    let unit = proxy_kind.estimate_unit(proxy, benchmark);
    let value = proxy.value.multiply(&benchmark.value, unit)?;

    let (_, band_ceiling) = Tier::Tier2.expected_band();
    let confidence = proxy.confidence.combine(benchmark.confidence).capped_at(band_ceiling);

    let fingerprint = Fingerprint::combine([&proxy.provenance.fingerprint, &benchmark.provenance.fingerprint]);
    let provenance = Provenance::new(SourceType::Derived, ExtractionMethod::Inferred, fingerprint)
        .with_reference(format!(
            "derived:{}/{}×{}/{}",
            proxy.source, proxy.metric, benchmark.source, benchmark.metric
        ));

    Some(FinancialMetric::new(
        proxy.identifier.clone(),
        ESTIMATE_METRIC,
        proxy.period.clone(),
        value,
        Tier::Tier2,
        confidence,
        ESTIMATOR_SOURCE,
        provenance,
    ))
}

/// Handle groundtruth_estimate_private tool invocation
///
/// Missing inputs give `unresolved` with `data: null` and an explanation
/// in `error`; the estimate is never fabricated from one input alone.
pub async fn handle_estimate(
    ctx: &ToolContext,
    params: EstimateParams,
    cancel: &CancellationToken,
) -> Result<Envelope<EstimateResult>, McpError> {
    let identifier = required("identifier", &params.identifier)?;
    let code = required("classification_code", &params.classification_code)?;
    let include = params.include_trace;

    let mut proxy_request = MetricRequest::new(identifier, params.proxy.metric())
        .with_bounds(TierBounds::starting_at(Tier::Tier2));
    let mut benchmark_request = MetricRequest::new(code, params.proxy.benchmark_metric())
        .with_bounds(TierBounds::only(Tier::Tier3));
    if let Some(period) = &params.period {
        proxy_request = proxy_request.for_period(period.as_str());
        benchmark_request = benchmark_request.for_period(period.as_str());
    }

    let mut trace = ResolutionTrace::new();
    let proxy = match ctx.engine().resolve(proxy_request, cancel).await {
        Ok(resolution) => {
            let metric = resolution.metric().cloned();
            trace.merge(resolution.trace);
            metric
        }
        Err(err) => return Ok(engine_failure(err)?.traced(trace, include)),
    };
    let Some(proxy) = proxy else {
        return Ok(Envelope::unresolved(None)
            .with_error(
                "missing_proxy",
                format!("No Tier2 or Tier3 source has {} for {identifier}", params.proxy.metric()),
            )
            .traced(trace, include));
    };

    let benchmark = match ctx.engine().resolve(benchmark_request, cancel).await {
        Ok(resolution) => {
            let metric = resolution.metric().cloned();
            trace.merge(resolution.trace);
            metric
        }
        Err(err) => return Ok(engine_failure(err)?.traced(trace, include)),
    };
    let Some(benchmark) = benchmark else {
        return Ok(Envelope::unresolved(None)
            .with_error(
                "missing_benchmark",
                format!("No benchmark {} for {code}", params.proxy.benchmark_metric()),
            )
            .traced(trace, include));
    };

    let Some(estimate) = derive_estimate(params.proxy, &proxy, &benchmark) else {
        return Ok(Envelope::error(
            "incompatible_values",
            format!(
                "{} ({}) and {} ({}) cannot be multiplied",
                proxy.metric,
                proxy.value.shape(),
                benchmark.metric,
                benchmark.value.shape()
            ),
        )
        .traced(trace, include));
    };

    tracing::info!(
        identifier = %identifier,
        proxy = params.proxy.metric(),
        confidence = estimate.confidence.value(),
        "Private revenue estimated"
    );

    let result = EstimateResult {
        formula: format!("{} × {}", proxy.metric, benchmark.metric),
        estimate: MetricAnswer::accepted(estimate),
        proxy: MetricAnswer::accepted(proxy),
        benchmark: MetricAnswer::accepted(benchmark),
    };
    Ok(Envelope::ok(result).traced(trace, include))
}
