//! Ground Truth Limiter
//!
//! Per-origin token-bucket rate limiting for outbound source calls.
//!
//! # Overview
//!
//! Each external origin gets one [`OriginLimiter`], sized from the
//! [`RateBudget`](groundtruth_domain::RateBudget) its module declares.
//! Modules that share an origin share the limiter, so the budget holds no
//! matter how many logical resolutions are running.
//!
//! [`OriginLimiter::acquire`] has three outcomes:
//!
//! - a token is available and the permit is returned immediately;
//! - the next token arrives within the bounded wait, so the caller sleeps
//!   and then gets the permit;
//! - the next token is further away than the bounded wait, and the call
//!   fails fast with [`LimiterError::Throttled`].
//!
//! A caller that receives `Throttled` must not contact the origin.
//!
//! # Usage
//!
//! ```
//! use groundtruth_domain::RateBudget;
//! use groundtruth_limiter::{LimiterConfig, LimiterRegistry};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = LimiterRegistry::new(LimiterConfig::default());
//! let limiter = registry.register("sec-edgar", RateBudget::per_second(10)).unwrap();
//!
//! let permit = limiter.acquire().await.unwrap();
//! assert!(permit.waited().is_zero());
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod limiter;
mod registry;

pub use config::LimiterConfig;
pub use error::LimiterError;
pub use limiter::{LimiterStats, OriginLimiter, Permit};
pub use registry::LimiterRegistry;
