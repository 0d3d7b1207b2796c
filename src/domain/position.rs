//! Per-venue position snapshots as produced by the venue adapters.

use crate::domain::{Decimal, Venue};
use std::collections::BTreeMap;

/// One open position as reported by a venue.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VenuePosition {
    /// Positive = long, negative = short, zero = flat.
    pub signed_size: Decimal,
    /// Zero when the venue did not report it.
    pub entry_price: Decimal,
    /// None when the venue has no usable mark price for the symbol.
    pub mark_price: Option<Decimal>,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    /// USD value of the position, used to back out a missing entry price.
    pub position_value: Option<Decimal>,
}

impl VenuePosition {
    pub fn new(signed_size: Decimal, entry_price: Decimal, mark_price: Option<Decimal>) -> Self {
        Self {
            signed_size,
            entry_price,
            mark_price,
            ..Default::default()
        }
    }

    pub fn with_pnl(mut self, unrealized: Decimal, realized: Decimal) -> Self {
        self.unrealized_pnl = unrealized;
        self.realized_pnl = realized;
        self
    }

    pub fn with_position_value(mut self, value: Decimal) -> Self {
        self.position_value = Some(value);
        self
    }

    pub fn is_flat(&self) -> bool {
        self.signed_size.is_zero()
    }
}

/// Every position one venue reported in one refresh, keyed by the venue's
/// native symbol (e.g. "BTCUSDT").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueSnapshot {
    pub venue: Venue,
    pub positions: BTreeMap<String, VenuePosition>,
    /// Total account equity in USD; None when the venue did not report it.
    pub account_value: Option<Decimal>,
}

impl VenueSnapshot {
    pub fn new(venue: Venue) -> Self {
        Self {
            venue,
            positions: BTreeMap::new(),
            account_value: None,
        }
    }

    pub fn with_account_value(mut self, value: Decimal) -> Self {
        self.account_value = Some(value);
        self
    }

    pub fn with_position(mut self, symbol: &str, position: VenuePosition) -> Self {
        self.positions.insert(symbol.to_string(), position);
        self
    }
}

/// Outcome of fetching one venue's snapshot for a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueFeed {
    Available(VenueSnapshot),
    /// The fetch failed; rows keep this venue's side marked unavailable.
    Unavailable { venue: Venue, reason: String },
}

impl VenueFeed {
    pub fn is_available(&self) -> bool {
        matches!(self, VenueFeed::Available(_))
    }
}
