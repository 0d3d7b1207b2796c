//! Hedge and funding-arbitrage estimation for one reconciled row.
//!
//! Pure: no I/O, no clock. The same inputs always produce the same output.

use super::normalizer::{InvalidRate, RateOutcome};
use super::reconciler::{CombinedRow, LegStatus, LegView};
use crate::domain::{Decimal, Leg, PositionSide};
use serde::Serialize;
use std::fmt;

/// Which legs collect funding this period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Receiver {
    VenueA,
    VenueB,
    Both,
    Neither,
}

impl Receiver {
    fn from_flags(a_receives: bool, b_receives: bool) -> Self {
        match (a_receives, b_receives) {
            (true, false) => Receiver::VenueA,
            (false, true) => Receiver::VenueB,
            (true, true) => Receiver::Both,
            (false, false) => Receiver::Neither,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HedgeEstimate {
    pub notional_a: Decimal,
    pub notional_b: Decimal,
    /// `min(notional_a, notional_b)`: only the overlap is hedged.
    pub hedged_notional: Decimal,
    pub rate_a_per_hour: Decimal,
    pub rate_b_per_hour: Decimal,
    pub net_rate_per_hour: Decimal,
    pub receiver: Receiver,
    /// USD per hour.
    pub est_pnl_per_hour: Decimal,
    /// `est_pnl_per_hour` as percent of hedged notional; zero when unhedged.
    pub est_return_pct_per_hour: Decimal,
}

/// Why no estimate exists for a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidEstimate {
    Rate { leg: Leg, reason: InvalidRate },
    VenueUnavailable { leg: Leg },
    MissingMark { leg: Leg },
}

impl fmt::Display for InvalidEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidEstimate::Rate { leg, reason } => write!(f, "{} rate invalid: {}", leg, reason),
            InvalidEstimate::VenueUnavailable { leg } => write!(f, "{} unavailable", leg),
            InvalidEstimate::MissingMark { leg } => write!(f, "{} mark price missing", leg),
        }
    }
}

impl std::error::Error for InvalidEstimate {}

pub type EstimateOutcome = Result<HedgeEstimate, InvalidEstimate>;

/// A short leg receives funding; a long or flat leg does not.
///
/// Applied identically to both legs.
pub fn receives_funding(leg: &LegView) -> bool {
    leg.side == PositionSide::Short
}

fn leg_notional(view: &LegView, leg: Leg) -> Result<Decimal, InvalidEstimate> {
    match view.status {
        LegStatus::Unavailable => Err(InvalidEstimate::VenueUnavailable { leg }),
        _ => view.notional().ok_or(InvalidEstimate::MissingMark { leg }),
    }
}

fn leg_rate(rate: &RateOutcome, leg: Leg) -> Result<Decimal, InvalidEstimate> {
    rate.as_ref()
        .map(|r| r.per_hour())
        .map_err(|reason| InvalidEstimate::Rate {
            leg,
            reason: reason.clone(),
        })
}

/// Combine two hourly rates according to who receives.
pub fn net_rate(receiver: Receiver, rate_a: Decimal, rate_b: Decimal) -> Decimal {
    match receiver {
        Receiver::VenueA => rate_a - rate_b,
        Receiver::VenueB => rate_b - rate_a,
        Receiver::Both => rate_a + rate_b,
        Receiver::Neither => -(rate_a + rate_b),
    }
}

/// Estimate hedged notional, net funding rate and hourly funding PnL.
///
/// An invalid rate on either leg makes the whole estimate invalid.
pub fn estimate(row: &CombinedRow, rate_a: &RateOutcome, rate_b: &RateOutcome) -> EstimateOutcome {
    let rate_a = leg_rate(rate_a, Leg::VenueA)?;
    let rate_b = leg_rate(rate_b, Leg::VenueB)?;
    let notional_a = leg_notional(&row.venue_a, Leg::VenueA)?;
    let notional_b = leg_notional(&row.venue_b, Leg::VenueB)?;

    let hedged_notional = notional_a.min(notional_b);
    let receiver = Receiver::from_flags(
        receives_funding(&row.venue_a),
        receives_funding(&row.venue_b),
    );
    let net_rate_per_hour = net_rate(receiver, rate_a, rate_b);

    let (est_pnl_per_hour, est_return_pct_per_hour) = if hedged_notional.is_positive() {
        let pnl = net_rate_per_hour.percent_of(hedged_notional);
        (pnl, pnl / hedged_notional * Decimal::hundred())
    } else {
        (Decimal::zero(), Decimal::zero())
    };

    Ok(HedgeEstimate {
        notional_a,
        notional_b,
        hedged_notional,
        rate_a_per_hour: rate_a,
        rate_b_per_hour: rate_b,
        net_rate_per_hour,
        receiver,
        est_pnl_per_hour,
        est_return_pct_per_hour,
    })
}
