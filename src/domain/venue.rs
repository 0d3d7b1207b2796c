//! Venue identifiers and the two legs of a hedged pair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A derivatives venue this service can read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Hyperliquid,
    Bybit,
    /// In-memory source used by tests and dry runs.
    Mock,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Hyperliquid => write!(f, "hyperliquid"),
            Venue::Bybit => write!(f, "bybit"),
            Venue::Mock => write!(f, "mock"),
        }
    }
}

/// Which side of the venue pair a value belongs to.
///
/// The engine only ever reasons about "A" and "B"; which concrete venue
/// plays each role is wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Leg {
    VenueA,
    VenueB,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::VenueA => write!(f, "venueA"),
            Leg::VenueB => write!(f, "venueB"),
        }
    }
}
