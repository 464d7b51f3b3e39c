//! Ground Truth Sources
//!
//! Reference [`SourceModule`](groundtruth_domain::SourceModule)
//! implementations.
//!
//! # Modules
//!
//! - [`SeededModule`]: in-memory fact tables with presets for regulatory
//!   filings, live quotes, private-company signals and industry benchmarks
//! - [`HttpJsonModule`]: a live origin speaking a small JSON protocol over
//!   HTTP
//!
//! # Examples
//!
//! ```
//! use groundtruth_domain::{SourceModule, Tier};
//! use groundtruth_sources::SeedProfile;
//!
//! let module = SeedProfile::Benchmarks.build("industry-benchmarks");
//! assert_eq!(module.tier(), Tier::Tier3);
//! ```

#![warn(missing_docs)]

mod error;
pub mod http;
pub mod seeded;

pub use error::SourceError;
pub use http::{HttpJsonConfig, HttpJsonModule};
pub use seeded::{CallCounter, SeedProfile, SeededModule};
