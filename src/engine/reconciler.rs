//! Cross-venue position matching.

use crate::domain::{Decimal, PositionSide, Symbol, VenueFeed, VenuePosition};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Whether a leg carries a real position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegStatus {
    Open,
    /// The venue was read and has no position for this symbol.
    Absent,
    /// The venue could not be read this cycle.
    Unavailable,
}

/// One venue's side of a combined row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegView {
    pub status: LegStatus,
    pub side: PositionSide,
    /// Absolute size.
    pub size: Decimal,
    pub signed_size: Decimal,
    pub entry_price: Decimal,
    /// True when `entry_price` was backed out of `position_value / size`.
    pub entry_price_is_estimated: bool,
    pub mark_price: Option<Decimal>,
    /// Unrealized + realized.
    pub net_pnl: Decimal,
}

impl LegView {
    fn placeholder(status: LegStatus) -> Self {
        Self {
            status,
            side: PositionSide::Flat,
            size: Decimal::zero(),
            signed_size: Decimal::zero(),
            entry_price: Decimal::zero(),
            entry_price_is_estimated: false,
            mark_price: None,
            net_pnl: Decimal::zero(),
        }
    }

    pub fn absent() -> Self {
        Self::placeholder(LegStatus::Absent)
    }

    pub fn unavailable() -> Self {
        Self::placeholder(LegStatus::Unavailable)
    }

    fn from_position(position: &VenuePosition) -> Self {
        let size = position.signed_size.abs();
        let (entry_price, entry_price_is_estimated) = resolve_entry_price(position);
        Self {
            status: LegStatus::Open,
            side: PositionSide::from_signed_size(position.signed_size),
            size,
            signed_size: position.signed_size,
            entry_price,
            entry_price_is_estimated,
            mark_price: position.mark_price,
            net_pnl: position.unrealized_pnl + position.realized_pnl,
        }
    }

    /// USD exposure `|size * mark|`; None when an open leg has no mark.
    pub fn notional(&self) -> Option<Decimal> {
        match self.status {
            LegStatus::Open => self.mark_price.map(|mark| (self.size * mark).abs()),
            LegStatus::Absent => Some(Decimal::zero()),
            LegStatus::Unavailable => None,
        }
    }
}

/// Reported entry price, or `position_value / size` when the venue says 0.
fn resolve_entry_price(position: &VenuePosition) -> (Decimal, bool) {
    if !position.entry_price.is_zero() {
        return (position.entry_price, false);
    }
    match position.position_value {
        Some(value) if !value.is_zero() && !position.signed_size.is_zero() => {
            (value.abs() / position.signed_size.abs(), true)
        }
        _ => (position.entry_price, false),
    }
}

/// Per-symbol view across both venues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedRow {
    pub symbol: Symbol,
    pub venue_a: LegView,
    pub venue_b: LegView,
    pub total_net_pnl: Decimal,
}

impl CombinedRow {
    /// A row with no position on either venue, e.g. for a watched symbol.
    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            venue_a: LegView::absent(),
            venue_b: LegView::absent(),
            total_net_pnl: Decimal::zero(),
        }
    }
}

/// Open positions of one feed keyed by canonical symbol.
///
/// Flat entries are dropped so they can never shadow a real position that
/// canonicalizes to the same root.
fn open_positions(feed: &VenueFeed) -> BTreeMap<Symbol, &VenuePosition> {
    let mut out = BTreeMap::new();
    let VenueFeed::Available(snapshot) = feed else {
        return out;
    };
    for (raw, position) in &snapshot.positions {
        if position.is_flat() {
            continue;
        }
        let symbol = Symbol::canonical(raw);
        if out.contains_key(&symbol) {
            warn!(venue=%snapshot.venue, raw_symbol=%raw, symbol=%symbol, "Duplicate position for root symbol, keeping first");
            continue;
        }
        out.insert(symbol, position);
    }
    out
}

fn leg_for(feed: &VenueFeed, position: Option<&&VenuePosition>) -> LegView {
    match (feed.is_available(), position) {
        (_, Some(position)) => LegView::from_position(position),
        (true, None) => LegView::absent(),
        (false, None) => LegView::unavailable(),
    }
}

/// Match both venues' positions by root symbol.
///
/// Rows exist for every symbol with a nonzero position on either venue and
/// come back in lexicographic symbol order.
pub fn reconcile(feed_a: &VenueFeed, feed_b: &VenueFeed) -> BTreeMap<Symbol, CombinedRow> {
    let positions_a = open_positions(feed_a);
    let positions_b = open_positions(feed_b);

    let symbols: BTreeSet<&Symbol> = positions_a.keys().chain(positions_b.keys()).collect();

    symbols
        .into_iter()
        .map(|symbol| {
            let venue_a = leg_for(feed_a, positions_a.get(symbol));
            let venue_b = leg_for(feed_b, positions_b.get(symbol));
            let total_net_pnl = venue_a.net_pnl + venue_b.net_pnl;
            (
                symbol.clone(),
                CombinedRow {
                    symbol: symbol.clone(),
                    venue_a,
                    venue_b,
                    total_net_pnl,
                },
            )
        })
        .collect()
}
