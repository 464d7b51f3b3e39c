//! Ground Truth Engine
//!
//! The Unified Truth Layer: resolves a named financial metric for an entity
//! by walking an ordered hierarchy of source modules and returning one
//! answer with provenance, confidence and a full resolution trace.
//!
//! # Resolution
//!
//! 1. The tiers allowed by the request's bounds are walked in priority
//!    order (Tier1, then Tier2, then Tier3), never reordered by latency.
//! 2. Every module at the current tier is dispatched concurrently. Each
//!    dispatch checks the module's cache, then its origin's rate limiter,
//!    then performs the live call under the per-module timeout.
//! 3. All of the tier's results are collected before selection. If any
//!    result meets the tier's threshold, the best one is returned and lower
//!    tiers are not consulted.
//! 4. Otherwise the next tier is tried. When every tier is exhausted the
//!    outcome is `Unresolved`, carrying the best below-threshold candidate.
//!
//! Within a tier the highest confidence wins, then the most recent
//! timestamp, then the module registered first.
//!
//! # Usage
//!
//! ```no_run
//! use groundtruth_domain::MetricRequest;
//! use groundtruth_engine::TruthLayer;
//! # use groundtruth_domain::SourceModule;
//! # async fn run(module: impl SourceModule + 'static) -> Result<(), Box<dyn std::error::Error>> {
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = TruthLayer::builder().module(module).build()?;
//! let request = MetricRequest::new("ACME-CIK-001", "revenue_total").for_period("FY2024");
//! let resolution = engine.resolve(request, &CancellationToken::new()).await?;
//!
//! if let Some(metric) = resolution.metric() {
//!     println!("{} from {} ({})", metric.value.as_f64().unwrap_or_default(), metric.source, metric.tier);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod dispatch;
mod engine;
mod error;
mod registry;
mod selection;

pub use config::{ConfigError, EngineConfig, ModuleOverride, TierThresholds};
pub use engine::{Resolution, ResolutionOutcome, TruthLayer, TruthLayerBuilder};
pub use error::EngineError;
pub use registry::{ModuleDescriptor, ModuleRegistry};
pub use selection::{preference, select_best, Candidate};
