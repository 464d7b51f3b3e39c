//! Confidence scores

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence score in `[0.0, 1.0]`
///
/// Every resolved value carries one. Tier1 answers cluster near
/// `[0.9, 1.0]`, Tier2 near `[0.5, 0.85]`; Tier3 scores describe how well
/// a benchmark applies, not how true a fact is.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Full confidence
    pub const CERTAIN: Confidence = Confidence(1.0);

    /// No confidence
    pub const NONE: Confidence = Confidence(0.0);

    /// Create a confidence score, rejecting values outside `[0, 1]` and NaN
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(DomainError::InvalidConfidence(value));
        }
        Ok(Self(value))
    }

    /// Create a confidence score, clamping into `[0, 1]` (NaN becomes 0)
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::NONE;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Raw value
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Joint confidence of two independent inputs (product)
    pub fn combine(self, other: Confidence) -> Confidence {
        Confidence(self.0 * other.0)
    }

    /// The weaker of two confidences
    pub fn min(self, other: Confidence) -> Confidence {
        if other.0 < self.0 {
            other
        } else {
            self
        }
    }

    /// Cap the score at `ceiling`
    pub fn capped_at(self, ceiling: f64) -> Confidence {
        Confidence::clamped(self.0.min(ceiling))
    }

    /// Whether the score meets a threshold
    pub fn meets(&self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl TryFrom<f64> for Confidence {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Confidence::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}
