//! Domain primitives: TimeMs, Symbol, PositionSide.

use serde::{Deserialize, Serialize};

/// Milliseconds in one hour.
pub const HOUR_MS: i64 = 60 * 60 * 1000;

/// Settlement-currency tags venues append to a root symbol.
const SETTLEMENT_SUFFIXES: [&str; 4] = ["-PERP", "PERP", "USDT", "USDC"];

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Index of the hourly slot this instant falls in.
    pub fn hour_slot(&self) -> i64 {
        self.0.div_euclid(HOUR_MS)
    }

    pub fn minus_hours(&self, hours: i64) -> TimeMs {
        TimeMs(self.0 - hours * HOUR_MS)
    }
}

/// Venue-agnostic root symbol (e.g. "BTC" for both "BTC" and "BTCUSDT").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    /// Wrap an already-canonical root symbol.
    pub fn new(symbol: String) -> Self {
        Symbol(symbol)
    }

    /// Canonicalize a venue-native symbol by stripping settlement suffixes.
    ///
    /// A suffix is only stripped when something remains, so a bare "USDC"
    /// stays "USDC".
    pub fn canonical(raw: &str) -> Self {
        let mut root = raw.trim();
        for suffix in SETTLEMENT_SUFFIXES {
            if let Some(stripped) = root.strip_suffix(suffix) {
                if !stripped.is_empty() {
                    root = stripped;
                    break;
                }
            }
        }
        Symbol(root.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a venue position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
    /// No position (or the venue could not be read).
    Flat,
}

impl PositionSide {
    pub fn from_signed_size(size: crate::domain::Decimal) -> Self {
        if size.is_positive() {
            PositionSide::Long
        } else if size.is_negative() {
            PositionSide::Short
        } else {
            PositionSide::Flat
        }
    }

    /// Table label: "LONG", "SHORT" or "-".
    pub fn label(&self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
            PositionSide::Flat => "-",
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
