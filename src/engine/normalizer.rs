//! Funding-rate normalization to percent per hour.
//!
//! Rates stay in percent units: a quote of `0.01` over `8` hours is
//! `0.00125` percent per hour, never `0.0000125`.

use crate::domain::{Decimal, FundingQuote, TimeMs, HOUR_MS};
use serde::Serialize;
use std::fmt;

/// A funding rate in percent per hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NormalizedRate(Decimal);

impl NormalizedRate {
    pub fn per_hour(&self) -> Decimal {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_per_hour(rate: Decimal) -> Self {
        NormalizedRate(rate)
    }
}

/// Why a funding rate could not be put on an hourly basis.
///
/// Distinct from a genuine zero rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidRate {
    /// The venue did not report a settlement interval.
    MissingPeriod,
    NonPositivePeriod(Decimal),
    /// Fewer than two distinct settlement timestamps were available.
    InsufficientSettlements(usize),
    /// No pair of settlement timestamps had a positive gap.
    NoPositiveGap,
    /// The quote itself could not be fetched.
    QuoteUnavailable(String),
}

impl fmt::Display for InvalidRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidRate::MissingPeriod => write!(f, "funding interval unknown"),
            InvalidRate::NonPositivePeriod(h) => {
                write!(f, "funding interval must be positive, got {}h", h)
            }
            InvalidRate::InsufficientSettlements(n) => {
                write!(f, "need two settlement timestamps, got {}", n)
            }
            InvalidRate::NoPositiveGap => write!(f, "settlement timestamps have no positive gap"),
            InvalidRate::QuoteUnavailable(reason) => write!(f, "quote unavailable: {}", reason),
        }
    }
}

impl std::error::Error for InvalidRate {}

/// Hourly rate for a quote, or the reason there is none.
pub type RateOutcome = Result<NormalizedRate, InvalidRate>;

/// Normalize a quote: `rate_per_period / period_hours`.
pub fn normalize(quote: &FundingQuote) -> RateOutcome {
    let period_hours = quote.period_hours.ok_or(InvalidRate::MissingPeriod)?;
    if !period_hours.is_positive() {
        return Err(InvalidRate::NonPositivePeriod(period_hours));
    }
    Ok(NormalizedRate(quote.rate_per_period / period_hours))
}

/// Derive a settlement interval in hours from settlement timestamps.
///
/// Timestamps are sorted descending and deduplicated; the first adjacent
/// pair with a strictly positive gap gives the interval.
pub fn derive_period_hours(settlements: &[TimeMs]) -> Result<Decimal, InvalidRate> {
    let mut sorted: Vec<TimeMs> = settlements.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();

    if sorted.len() < 2 {
        return Err(InvalidRate::InsufficientSettlements(sorted.len()));
    }

    sorted
        .windows(2)
        .map(|pair| pair[0].as_i64() - pair[1].as_i64())
        .find(|gap_ms| *gap_ms > 0)
        .map(|gap_ms| Decimal::from_i64(gap_ms) / Decimal::from_i64(HOUR_MS))
        .ok_or(InvalidRate::NoPositiveGap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_normalize_divides_by_period() {
        let quote = FundingQuote::new(d("0.01"), Some(d("8")));
        assert_eq!(normalize(&quote).unwrap().per_hour(), d("0.00125"));
    }

    #[test]
    fn test_normalize_keeps_percent_units() {
        // Venue fraction 0.0001 arrives as 0.01 percent; hourly stays percent.
        let quote = FundingQuote::new(d("0.0001").fraction_to_percent(), Some(d("1")));
        assert_eq!(normalize(&quote).unwrap().per_hour(), d("0.01"));
    }

    #[test]
    fn test_normalize_is_exact_quotient() {
        for (r, h) in [("0.01", "8"), ("-0.0375", "4"), ("0.005", "1"), ("0.02", "3"), ("0", "8")] {
            let quote = FundingQuote::new(d(r), Some(d(h)));
            assert_eq!(normalize(&quote).unwrap().per_hour(), d(r) / d(h));
        }
    }

    #[test]
    fn test_zero_rate_is_valid_zero() {
        let quote = FundingQuote::new(Decimal::zero(), Some(d("8")));
        assert_eq!(normalize(&quote).unwrap().per_hour(), Decimal::zero());
    }

    #[test]
    fn test_missing_or_non_positive_period_is_invalid() {
        let missing = FundingQuote::new(d("0.01"), None);
        assert_eq!(normalize(&missing), Err(InvalidRate::MissingPeriod));

        let zero = FundingQuote::new(d("0.01"), Some(Decimal::zero()));
        assert_eq!(normalize(&zero), Err(InvalidRate::NonPositivePeriod(Decimal::zero())));

        let negative = FundingQuote::new(d("0.01"), Some(d("-8")));
        assert!(matches!(normalize(&negative), Err(InvalidRate::NonPositivePeriod(_))));
    }

    #[test]
    fn test_derive_period_from_unsorted_duplicates() {
        let ts = [
            TimeMs::new(8 * HOUR_MS),
            TimeMs::new(16 * HOUR_MS),
            TimeMs::new(16 * HOUR_MS),
            TimeMs::new(0),
        ];
        assert_eq!(derive_period_hours(&ts).unwrap(), d("8"));
    }

    #[test]
    fn test_derive_period_uses_most_recent_gap() {
        // Interval changed from 8h to 4h; the latest pair wins.
        let ts = [TimeMs::new(0), TimeMs::new(8 * HOUR_MS), TimeMs::new(12 * HOUR_MS)];
        assert_eq!(derive_period_hours(&ts).unwrap(), d("4"));
    }

    #[test]
    fn test_derive_period_fractional_hours() {
        let ts = [TimeMs::new(0), TimeMs::new(HOUR_MS / 2)];
        assert_eq!(derive_period_hours(&ts).unwrap(), d("0.5"));
    }

    #[test]
    fn test_derive_period_needs_two_distinct_timestamps() {
        assert_eq!(derive_period_hours(&[]), Err(InvalidRate::InsufficientSettlements(0)));
        assert_eq!(
            derive_period_hours(&[TimeMs::new(5)]),
            Err(InvalidRate::InsufficientSettlements(1))
        );
        assert_eq!(
            derive_period_hours(&[TimeMs::new(5), TimeMs::new(5)]),
            Err(InvalidRate::InsufficientSettlements(1))
        );
    }
}
