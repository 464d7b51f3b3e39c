//! Verify tool - check numeric claims in free text against Tier1 facts

use super::{required, ToolContext};
use crate::claims::ExtractedClaim;
use crate::envelope::{engine_failure, Envelope, MetricAnswer};
use crate::McpError;
use groundtruth_domain::{MetricRequest, ResolutionTrace, Tier, TierBounds};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Parameters for claim verification
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    /// Entity the text is about
    pub identifier: String,
    /// Free text containing the claims
    pub text: String,
    /// Period for claims that do not name one
    #[serde(default)]
    pub period: Option<String>,
    /// Relative tolerance in percent (server default otherwise)
    #[serde(default)]
    pub tolerance_pct: Option<f64>,
    /// Attach the resolution trace
    #[serde(default)]
    pub include_trace: bool,
}

/// Verdict for one claim, or for the whole text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    /// Claimed value agrees with the Tier1 fact within tolerance
    Verified,
    /// Claimed value disagrees with the Tier1 fact
    Discrepancy,
    /// No checkable claim, or no Tier1 fact to check against
    Unverifiable,
}

/// Result of checking one claim
#[derive(Debug, Clone, Serialize)]
pub struct ClaimCheck {
    /// The claim as extracted
    pub claim: ExtractedClaim,
    /// Verdict
    pub status: ClaimStatus,
    /// Value stated in the text
    pub claimed_value: f64,
    /// Tier1 value it was checked against
    pub resolved_value: Option<f64>,
    /// claimed − resolved
    pub delta: Option<f64>,
    /// Delta relative to the resolved value, in percent
    pub delta_pct: Option<f64>,
    /// The Tier1 answer
    pub resolved: Option<MetricAnswer>,
    /// Why the claim could not be verified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ClaimCheck {
    fn unverifiable(claim: ExtractedClaim, resolved: Option<MetricAnswer>, reason: impl Into<String>) -> Self {
        Self {
            claimed_value: claim.value,
            claim,
            status: ClaimStatus::Unverifiable,
            resolved_value: resolved.as_ref().and_then(MetricAnswer::amount),
            delta: None,
            delta_pct: None,
            resolved,
            reason: Some(reason.into()),
        }
    }
}

/// Verification of a whole text
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    /// Overall verdict
    pub status: ClaimStatus,
    /// Tolerance applied, in percent
    pub tolerance_pct: f64,
    /// One check per extracted claim, in order of appearance
    pub claims: Vec<ClaimCheck>,
}

impl VerificationResult {
    /// Overall verdict: any discrepancy wins, then any unverifiable claim
    /// (or no claims at all), else verified
    pub fn overall(claims: &[ClaimCheck]) -> ClaimStatus {
        if claims.iter().any(|c| c.status == ClaimStatus::Discrepancy) {
            ClaimStatus::Discrepancy
        } else if claims.is_empty() || claims.iter().any(|c| c.status == ClaimStatus::Unverifiable) {
            ClaimStatus::Unverifiable
        } else {
            ClaimStatus::Verified
        }
    }
}

/// Compare a claimed value with a resolved one
///
/// Returns the verdict, the absolute delta and the delta in percent of the
/// resolved value. A resolved value of zero only verifies an exact zero.
pub fn compare(claimed: f64, resolved: f64, tolerance_pct: f64) -> (ClaimStatus, f64, Option<f64>) {
    let delta = claimed - resolved;
    if resolved == 0.0 {
        let status = if claimed == 0.0 {
            ClaimStatus::Verified
        } else {
            ClaimStatus::Discrepancy
        };
        return (status, delta, None);
    }

    let delta_pct = delta / resolved.abs() * 100.0;
    let status = if delta_pct.abs() <= tolerance_pct {
        ClaimStatus::Verified
    } else {
        ClaimStatus::Discrepancy
    };
    (status, delta, Some(delta_pct))
}

fn check(claim: ExtractedClaim, answer: Option<MetricAnswer>, tolerance_pct: f64) -> ClaimCheck {
    let Some(answer) = answer else {
        let reason = format!("No Tier1 source has {}", claim.metric);
        return ClaimCheck::unverifiable(claim, None, reason);
    };
    if answer.below_threshold {
        return ClaimCheck::unverifiable(claim, Some(answer), "Tier1 value is below the confidence threshold");
    }
    let Some(resolved) = answer.amount() else {
        return ClaimCheck::unverifiable(claim, Some(answer), "Tier1 value is not numeric");
    };
    if let (Some(claimed_unit), Some(resolved_unit)) = (claim.unit.as_deref(), answer.metric.value.unit()) {
        if !claimed_unit.eq_ignore_ascii_case(resolved_unit) {
            let reason = format!("claim is in {claimed_unit}, Tier1 value is in {resolved_unit}");
            return ClaimCheck::unverifiable(claim, Some(answer), reason);
        }
    }

    let (status, delta, delta_pct) = compare(claim.value, resolved, tolerance_pct);
    ClaimCheck {
        claimed_value: claim.value,
        claim,
        status,
        resolved_value: Some(resolved),
        delta: Some(delta),
        delta_pct,
        resolved: Some(answer),
        reason: None,
    }
}

/// Handle groundtruth_verify_claim tool invocation
///
/// Every claim is checked against a Tier1-only resolution; nothing below
/// Tier1 is used to confirm or refute a claim.
pub async fn handle_verify(
    ctx: &ToolContext,
    params: VerifyParams,
    cancel: &CancellationToken,
) -> Result<Envelope<VerificationResult>, McpError> {
    let identifier = required("identifier", &params.identifier)?;
    let tolerance_pct = params.tolerance_pct.unwrap_or(ctx.verification().tolerance_pct);
    if !tolerance_pct.is_finite() || tolerance_pct < 0.0 {
        return Err(McpError::InvalidRequest(format!(
            "tolerance_pct must be a non-negative number, got {tolerance_pct}"
        )));
    }

    let mut trace = ResolutionTrace::new();
    let mut checks = Vec::new();
    for mut claim in ctx.extractor().extract(&params.text) {
        if claim.period.is_none() {
            claim.period = params.period.clone();
        }

        let mut request = MetricRequest::new(identifier, claim.metric.as_str())
            .with_bounds(TierBounds::only(Tier::Tier1));
        if let Some(period) = &claim.period {
            request = request.for_period(period.as_str());
        }

        let resolution = match ctx.engine().resolve(request, cancel).await {
            Ok(resolution) => resolution,
            Err(err) => return Ok(engine_failure(err)?.traced(trace, params.include_trace)),
        };
        let (answer, claim_trace) = MetricAnswer::from_resolution(resolution);
        trace.merge(claim_trace);

        let checked = check(claim, answer, tolerance_pct);
        tracing::debug!(
            metric = %checked.claim.metric,
            status = ?checked.status,
            delta_pct = ?checked.delta_pct,
            "Claim checked"
        );
        checks.push(checked);
    }

    let result = VerificationResult {
        status: VerificationResult::overall(&checks),
        tolerance_pct,
        claims: checks,
    };
    tracing::info!(
        identifier = %identifier,
        claims = result.claims.len(),
        status = ?result.status,
        "Claims verified"
    );
    Ok(Envelope::ok(result).traced(trace, params.include_trace))
}
