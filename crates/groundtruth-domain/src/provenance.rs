//! Provenance tracking
//!
//! Every resolved value must be traceable back to concrete source material.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Kind of origin a value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Regulatory filing (e.g. an annual report)
    RegulatoryFiling,
    /// Live market quote
    MarketQuote,
    /// Estimated private-company data
    PrivateEstimate,
    /// Industry benchmark dataset
    IndustryBenchmark,
    /// Computed by the engine from other resolved values
    Derived,
}

impl SourceType {
    /// Get the source type as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::RegulatoryFiling => "regulatory_filing",
            SourceType::MarketQuote => "market_quote",
            SourceType::PrivateEstimate => "private_estimate",
            SourceType::IndustryBenchmark => "industry_benchmark",
            SourceType::Derived => "derived",
        }
    }
}

/// How the value was obtained from the raw material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Read directly from a named field
    DirectField,
    /// Arithmetic over directly-read fields
    Computed,
    /// Estimated from proxy signals
    Inferred,
}

/// SHA-256 fingerprint (lowercase hex) of the raw material a value came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint raw bytes
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(hex::encode(digest))
    }

    /// Fingerprint a value derived from several inputs
    ///
    /// Order matters: the same inputs in a different order produce a
    /// different fingerprint.
    pub fn combine<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Fingerprint>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.0.as_bytes());
            hasher.update(b"\n");
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured provenance record attached to every resolved value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Kind of origin
    pub source_type: SourceType,

    /// URL or document reference, if the origin has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Extraction method
    pub method: ExtractionMethod,

    /// Fingerprint of the raw material, for later re-verification
    pub fingerprint: Fingerprint,
}

impl Provenance {
    /// Create a provenance record
    pub fn new(source_type: SourceType, method: ExtractionMethod, fingerprint: Fingerprint) -> Self {
        Self {
            source_type,
            reference: None,
            method,
            fingerprint,
        }
    }

    /// Attach a URL or document reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}
