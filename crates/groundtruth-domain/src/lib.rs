//! Ground Truth Domain Layer
//!
//! Core value types shared by every component of the resolution engine.
//! Infrastructure (caching, throttling, transport) lives in other crates;
//! this crate only defines what an answer *is* and the contract a data
//! origin must satisfy to produce one.
//!
//! ## Key Concepts
//!
//! - **Tier**: authority class of a data source (Tier1 regulatory → Tier3 contextual)
//! - **Confidence**: a score in `[0.0, 1.0]` attached to every answer
//! - **Provenance**: source type, reference, extraction method and content fingerprint
//! - **FinancialMetric**: the resolved value plus all of the above
//! - **ResolutionTrace**: the audit record of every module consulted for one request
//! - **SourceModule**: the single-operation contract every data origin implements

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod confidence;
pub mod error;
pub mod metric;
pub mod provenance;
pub mod tier;
pub mod trace;
pub mod traits;

// Re-exports for convenience
pub use confidence::Confidence;
pub use error::{DomainError, ModuleError};
pub use metric::{EntityId, FinancialMetric, MetricRequest, MetricValue};
pub use provenance::{ExtractionMethod, Fingerprint, Provenance, SourceType};
pub use tier::{CacheClass, Tier, TierBounds};
pub use trace::{ResolutionTrace, TraceEntry, TraceOutcome};
pub use traits::{RateBudget, SourceModule};
