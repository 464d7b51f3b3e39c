//! Tool implementations
//!
//! Each tool is a thin orchestration over [`TruthLayer::resolve`]; none of
//! them talks to a source module directly.

mod drivers;
mod estimate;
mod lookup;
mod verify;

pub use drivers::{handle_value_drivers, Direction, DriverMode, DriverResult, DriversParams};
pub use estimate::{handle_estimate, EstimateParams, EstimateResult, ProxyKind};
pub use lookup::{handle_lookup, LookupData, LookupItem, LookupParams};
pub use verify::{handle_verify, ClaimCheck, ClaimStatus, VerificationResult, VerifyParams};

use crate::claims::ClaimExtractor;
use crate::config::VerificationConfig;
use crate::McpError;
use groundtruth_domain::Tier;
use groundtruth_engine::TruthLayer;
use std::sync::Arc;

/// Shared state every tool runs against
pub struct ToolContext {
    engine: Arc<TruthLayer>,
    verification: VerificationConfig,
    extractor: ClaimExtractor,
}

impl ToolContext {
    /// Create a context, compiling the claim patterns once
    pub fn new(engine: Arc<TruthLayer>, verification: VerificationConfig) -> Result<Self, McpError> {
        let extractor = ClaimExtractor::new(verification.proximity_chars)?;
        Ok(Self {
            engine,
            verification,
            extractor,
        })
    }

    /// The Truth Layer
    pub fn engine(&self) -> &TruthLayer {
        &self.engine
    }

    /// Verification defaults
    pub fn verification(&self) -> &VerificationConfig {
        &self.verification
    }

    /// Claim extractor
    pub fn extractor(&self) -> &ClaimExtractor {
        &self.extractor
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, McpError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(McpError::InvalidRequest(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn parse_tier(label: &str) -> Result<Tier, McpError> {
    Tier::parse(label).ok_or_else(|| McpError::InvalidRequest(format!("Invalid tier: {label}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert_eq!(required("identifier", " ACME ").unwrap(), "ACME");
        assert!(matches!(required("identifier", "  "), Err(McpError::InvalidRequest(_))));
    }

    #[test]
    fn test_parse_tier() {
        assert_eq!(parse_tier("Tier2").unwrap(), Tier::Tier2);
        assert_eq!(parse_tier("3").unwrap(), Tier::Tier3);
        assert!(parse_tier("Tier9").is_err());
    }
}
