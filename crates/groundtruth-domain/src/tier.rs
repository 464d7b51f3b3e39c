//! Tier module - authority classes for data sources

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authority tier of a data source
///
/// Tiers are evaluated strictly in order during resolution:
/// - Tier1: Authoritative/regulatory (filed facts)
/// - Tier2: Market-observed or estimated
/// - Tier3: Contextual/benchmark (advisory only, never asserted as fact)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Regulatory filings and other authoritative origins
    Tier1,

    /// Live market data and private-company estimates
    Tier2,

    /// Industry benchmarks and other contextual data
    Tier3,
}

impl Tier {
    /// All tiers in resolution order
    pub const ALL: [Tier; 3] = [Tier::Tier1, Tier::Tier2, Tier::Tier3];

    /// Get the tier name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier1 => "Tier1",
            Tier::Tier2 => "Tier2",
            Tier::Tier3 => "Tier3",
        }
    }

    /// Parse a tier from a string
    ///
    /// Accepts `Tier1`, `tier1`, `tier_1` and the bare rank `1`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "").as_str() {
            "tier1" | "1" => Some(Tier::Tier1),
            "tier2" | "2" => Some(Tier::Tier2),
            "tier3" | "3" => Some(Tier::Tier3),
            _ => None,
        }
    }

    /// Numeric rank (1 = most authoritative)
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Tier1 => 1,
            Tier::Tier2 => 2,
            Tier::Tier3 => 3,
        }
    }

    /// The next tier to fall back to
    pub fn next(&self) -> Option<Self> {
        match self {
            Tier::Tier1 => Some(Tier::Tier2),
            Tier::Tier2 => Some(Tier::Tier3),
            Tier::Tier3 => None, // Nothing below contextual data
        }
    }

    /// Whether answers from this tier may be asserted as fact
    pub fn is_factual(&self) -> bool {
        !self.is_advisory()
    }

    /// Whether answers from this tier are contextual only
    pub fn is_advisory(&self) -> bool {
        matches!(self, Tier::Tier3)
    }

    /// The confidence band answers from this tier normally fall into
    pub fn expected_band(&self) -> (f64, f64) {
        match self {
            Tier::Tier1 => (0.9, 1.0),
            Tier::Tier2 => (0.5, 0.85),
            Tier::Tier3 => (0.0, 1.0),
        }
    }

    /// Default cache class for modules at this tier
    pub fn default_cache_class(&self) -> CacheClass {
        match self {
            Tier::Tier1 => CacheClass::Regulatory,
            Tier::Tier2 => CacheClass::LiveMarket,
            Tier::Tier3 => CacheClass::Benchmark,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid tier: {}", s))
    }
}

/// Freshness class of the data a module serves
///
/// Two modules at the same tier can need very different TTLs: a live
/// quote goes stale in minutes, a private-company estimate in weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheClass {
    /// Filed facts (effectively permanent)
    Regulatory,
    /// Live market observations (minutes)
    LiveMarket,
    /// Estimated/private-company data (weeks)
    Estimated,
    /// Industry benchmarks (weeks to a month)
    Benchmark,
}

impl CacheClass {
    /// Get the class name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheClass::Regulatory => "regulatory",
            CacheClass::LiveMarket => "live_market",
            CacheClass::Estimated => "estimated",
            CacheClass::Benchmark => "benchmark",
        }
    }
}

/// Inclusive range of tiers a request may be answered from
///
/// `ceiling` is the most authoritative tier to start at, `floor` the
/// least authoritative tier the caller will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBounds {
    /// Most authoritative tier consulted
    pub ceiling: Tier,
    /// Least authoritative tier consulted
    pub floor: Tier,
}

impl TierBounds {
    /// Every tier, Tier1 through Tier3
    pub fn all() -> Self {
        Self {
            ceiling: Tier::Tier1,
            floor: Tier::Tier3,
        }
    }

    /// A single tier only
    pub fn only(tier: Tier) -> Self {
        Self {
            ceiling: tier,
            floor: tier,
        }
    }

    /// Tier1 down to `floor` ("Tier2 or better")
    pub fn at_least(floor: Tier) -> Self {
        Self {
            ceiling: Tier::Tier1,
            floor,
        }
    }

    /// `ceiling` down to Tier3
    pub fn starting_at(ceiling: Tier) -> Self {
        Self {
            ceiling,
            floor: Tier::Tier3,
        }
    }

    /// Whether the bounds are well-formed (ceiling not below floor)
    pub fn is_valid(&self) -> bool {
        self.ceiling <= self.floor
    }

    /// Tiers to walk, in priority order
    pub fn tiers(&self) -> Vec<Tier> {
        Tier::ALL
            .iter()
            .copied()
            .filter(|t| *t >= self.ceiling && *t <= self.floor)
            .collect()
    }

    /// Whether a tier lies within the bounds
    pub fn contains(&self, tier: Tier) -> bool {
        tier >= self.ceiling && tier <= self.floor
    }
}

impl Default for TierBounds {
    fn default() -> Self {
        Self::all()
    }
}
