//! Funding quotes and historical funding observations.

use crate::domain::{Decimal, TimeMs};

/// A venue's current funding quote for one symbol.
///
/// `rate_per_period` is in percent. `period_hours` is None when the venue
/// could not tell us its settlement interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingQuote {
    pub rate_per_period: Decimal,
    pub period_hours: Option<Decimal>,
    pub next_settlement: Option<TimeMs>,
}

impl FundingQuote {
    pub fn new(rate_per_period: Decimal, period_hours: Option<Decimal>) -> Self {
        Self {
            rate_per_period,
            period_hours,
            next_settlement: None,
        }
    }

    pub fn with_next_settlement(mut self, next: TimeMs) -> Self {
        self.next_settlement = Some(next);
        self
    }
}

/// One historical settlement: the percent rate charged for the period
/// ending at `time_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingSettlement {
    pub time_ms: TimeMs,
    pub rate_pct: Decimal,
}

impl FundingSettlement {
    pub fn new(time_ms: TimeMs, rate_pct: Decimal) -> Self {
        Self { time_ms, rate_pct }
    }
}

/// Both venues' hourly rates (percent per hour) for the same hourly slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairedObservation {
    pub time_ms: TimeMs,
    pub rate_a: Decimal,
    pub rate_b: Decimal,
}
