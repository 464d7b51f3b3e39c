//! Resolution trace - audit record of every module consulted for one request

use crate::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened when a module was consulted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TraceOutcome {
    /// Live call returned a value
    Hit,
    /// Value served from the module's cache
    CacheHit,
    /// Origin has no data
    Miss,
    /// Module failed (unavailable or malformed)
    Error {
        /// Error kind
        kind: String,
        /// Error message
        message: String,
    },
    /// Origin signaled throttling
    RateLimited,
    /// Engine's own limiter refused a token within the bounded wait
    Throttled,
    /// Per-module timeout elapsed
    TimedOut,
}

impl TraceOutcome {
    /// Short name
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceOutcome::Hit => "hit",
            TraceOutcome::CacheHit => "cache_hit",
            TraceOutcome::Miss => "miss",
            TraceOutcome::Error { .. } => "error",
            TraceOutcome::RateLimited => "rate_limited",
            TraceOutcome::Throttled => "throttled",
            TraceOutcome::TimedOut => "timed_out",
        }
    }

    /// Whether the module produced a value
    pub fn produced_value(&self) -> bool {
        matches!(self, TraceOutcome::Hit | TraceOutcome::CacheHit)
    }
}

/// One module consultation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Module name
    pub module: String,
    /// Module tier
    pub tier: Tier,
    /// Outcome
    #[serde(flatten)]
    pub outcome: TraceOutcome,
    /// Wall-clock latency including cache, limiter and live call
    pub latency_ms: u64,
    /// Confidence of the returned value, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Number of live calls issued to the origin (0 on cache hit or throttle)
    pub live_calls: u32,
}

impl TraceEntry {
    /// Create an entry
    pub fn new(module: impl Into<String>, tier: Tier, outcome: TraceOutcome, latency_ms: u64) -> Self {
        Self {
            module: module.into(),
            tier,
            outcome,
            latency_ms,
            confidence: None,
            live_calls: 0,
        }
    }

    /// Record the confidence of the returned value
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Record how many live calls were issued
    pub fn with_live_calls(mut self, live_calls: u32) -> Self {
        self.live_calls = live_calls;
        self
    }
}

/// Ordered audit record of one resolution
///
/// Created at query start and appended to as the Truth Layer walks tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionTrace {
    /// Trace identifier (UUIDv7, sorts chronologically)
    pub id: Uuid,
    /// When resolution started
    pub started_at: DateTime<Utc>,
    /// Module consultations, in tier order then registration order
    pub entries: Vec<TraceEntry>,
}

impl ResolutionTrace {
    /// Start a new trace
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Append an entry
    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Append several entries, preserving their order
    pub fn extend<I: IntoIterator<Item = TraceEntry>>(&mut self, entries: I) {
        self.entries.extend(entries);
    }

    /// Append another trace's entries (sub-resolutions of a tool call)
    pub fn merge(&mut self, other: ResolutionTrace) {
        self.entries.extend(other.entries);
    }

    /// Total live calls issued across all modules
    pub fn live_calls(&self) -> u32 {
        self.entries.iter().map(|e| e.live_calls).sum()
    }

    /// Number of entries with the given outcome name
    pub fn count(&self, outcome: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.as_str() == outcome)
            .count()
    }

    /// Entries for one module
    pub fn entries_for<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a TraceEntry> + 'a {
        self.entries.iter().filter(move |e| e.module == module)
    }

    /// Tiers that were consulted, in order, without repeats
    pub fn tiers_consulted(&self) -> Vec<Tier> {
        let mut tiers: Vec<Tier> = Vec::new();
        for entry in &self.entries {
            if tiers.last() != Some(&entry.tier) {
                tiers.push(entry.tier);
            }
        }
        tiers
    }
}

impl Default for ResolutionTrace {
    fn default() -> Self {
        Self::new()
    }
}
