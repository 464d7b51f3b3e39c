//! Ground Truth MCP Server
//!
//! Model Context Protocol server that exposes the Truth Layer to AI
//! clients over stdio.
//!
//! Provides 4 MCP tools:
//! - `groundtruth_lookup` - Authoritative metric lookup, Tier1 by default
//! - `groundtruth_estimate_private` - Private-company revenue estimate
//! - `groundtruth_verify_claim` - Check numeric claims in text
//! - `groundtruth_value_drivers` - Compare a metric with its industry benchmark
//!
//! Every tool answers with an [`envelope::Envelope`]: `status`, `data`,
//! optional `trace` and optional `error`.
//!
//! # Example
//!
//! ```no_run
//! use groundtruth_mcp::{build_engine, GroundTruthConfig, McpServer, ToolContext};
//! use std::sync::Arc;
//! use tokio::io::BufReader;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), groundtruth_mcp::McpError> {
//! let config = GroundTruthConfig::default();
//! let engine = Arc::new(build_engine(&config)?);
//! let ctx = ToolContext::new(engine, config.verification.clone())?;
//!
//! let server = McpServer::new(ctx);
//! server
//!     .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod bootstrap;
pub mod claims;
pub mod config;
pub mod envelope;
mod error;
pub mod protocol;
mod server;
pub mod tools;

pub use bootstrap::build_engine;
pub use claims::{ClaimExtractor, ExtractedClaim};
pub use config::{GroundTruthConfig, ModuleKind, ModuleSpec, SeedSpec, VerificationConfig};
pub use envelope::{Envelope, ErrorBody, MetricAnswer, Status};
pub use error::McpError;
pub use server::{McpServer, PROTOCOL_VERSION, TOOL_DRIVERS, TOOL_ESTIMATE, TOOL_LOOKUP, TOOL_VERIFY};
pub use tools::ToolContext;
