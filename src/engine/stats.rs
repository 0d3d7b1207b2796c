//! Rolling success-rate and annualized-spread statistics over paired
//! historical funding rates.
//!
//! Venue A is the reference venue: a "success" is an hour in which A had the
//! lower rate, i.e. going long on A and short on B collected the spread.

use super::normalizer::{derive_period_hours, normalize};
use crate::domain::{Decimal, FundingQuote, FundingSettlement, Leg, PairedObservation, TimeMs, HOUR_MS};
use std::collections::BTreeMap;

pub const HOURS_PER_YEAR: i64 = 24 * 365;
pub const SEVEN_DAYS_HOURS: i64 = 7 * 24;
pub const THIRTY_DAYS_HOURS: i64 = 30 * 24;

/// Settlement gaps longer than this are treated as missing data rather
/// than one very long funding period.
pub const MAX_SETTLEMENT_PERIOD_HOURS: i64 = 8;

/// Expand settlements into per-hour rates keyed by hourly slot.
///
/// Each settlement's rate is normalized by the gap to the previous
/// settlement and applied to every hourly slot in that gap. The first
/// settlement has no known period and contributes nothing.
pub fn hourly_series(settlements: &[FundingSettlement]) -> BTreeMap<i64, Decimal> {
    let mut sorted = settlements.to_vec();
    sorted.sort_by_key(|s| s.time_ms);
    sorted.dedup_by_key(|s| s.time_ms);

    let mut series = BTreeMap::new();
    for pair in sorted.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let Ok(period_hours) = derive_period_hours(&[prev.time_ms, cur.time_ms]) else {
            continue;
        };
        if period_hours > Decimal::from_i64(MAX_SETTLEMENT_PERIOD_HOURS) {
            continue;
        }
        let Ok(rate) = normalize(&FundingQuote::new(cur.rate_pct, Some(period_hours))) else {
            continue;
        };
        for slot in prev.time_ms.hour_slot()..cur.time_ms.hour_slot() {
            series.insert(slot, rate.per_hour());
        }
    }
    series
}

/// Join two hourly series on matching slots.
pub fn pair_observations(
    series_a: &BTreeMap<i64, Decimal>,
    series_b: &BTreeMap<i64, Decimal>,
) -> Vec<PairedObservation> {
    series_a
        .iter()
        .filter_map(|(slot, rate_a)| {
            series_b.get(slot).map(|rate_b| PairedObservation {
                time_ms: TimeMs::new(slot * HOUR_MS),
                rate_a: *rate_a,
                rate_b: *rate_b,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadStats {
    pub window_hours: i64,
    /// Hours in the window with both rates present.
    pub observed_hours: i64,
    /// Share of non-zero-spread hours in which venue A had the lower rate.
    pub success_rate_pct: Decimal,
    /// Venue to go long on for the window (the other is shorted).
    pub better_venue: Leg,
    /// Mean oriented spread per observed hour, scaled to a 365-day year.
    pub annualized_rate_pct: Decimal,
    pub max_spread: Decimal,
    pub min_spread: Decimal,
    /// Share of the nominal window with a zero or missing spread.
    pub zero_spread_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodStats {
    /// No hour in the window had a non-zero spread.
    NoData { window_hours: i64 },
    Observed(SpreadStats),
}

impl PeriodStats {
    pub fn window_hours(&self) -> i64 {
        match self {
            PeriodStats::NoData { window_hours } => *window_hours,
            PeriodStats::Observed(stats) => stats.window_hours,
        }
    }

    pub fn observed(&self) -> Option<&SpreadStats> {
        match self {
            PeriodStats::NoData { .. } => None,
            PeriodStats::Observed(stats) => Some(stats),
        }
    }
}

/// Aggregate the `window_hours` hourly slots ending just before `end_slot`.
///
/// The window is `[end_slot - window_hours, end_slot)`. Slots in it without
/// an observation count as missing, including a trailing run where one venue
/// stopped reporting.
pub fn aggregate(history: &[PairedObservation], window_hours: i64, end_slot: i64) -> PeriodStats {
    let no_data = PeriodStats::NoData { window_hours };
    if window_hours <= 0 {
        return no_data;
    }
    let window = (end_slot - window_hours)..end_slot;

    // One observation per slot; later entries win.
    let rows: BTreeMap<i64, &PairedObservation> = history
        .iter()
        .map(|o| (o.time_ms.hour_slot(), o))
        .filter(|(slot, _)| window.contains(slot))
        .collect();

    // Spread oriented toward "long A, short B".
    let spreads: Vec<(Decimal, &PairedObservation)> =
        rows.values().map(|o| (o.rate_b - o.rate_a, *o)).collect();

    let nonzero: Vec<&PairedObservation> = spreads
        .iter()
        .filter(|(spread, _)| !spread.is_zero())
        .map(|(_, o)| *o)
        .collect();
    if nonzero.is_empty() {
        return no_data;
    }

    let nonzero_hours = nonzero.len() as i64;
    let successes = nonzero.iter().filter(|o| o.rate_a < o.rate_b).count() as i64;
    let success_rate_pct =
        Decimal::from_i64(successes) * Decimal::hundred() / Decimal::from_i64(nonzero_hours);

    let total_a: Decimal = spreads.iter().map(|(spread, _)| *spread).sum();
    let better_venue = if total_a.is_negative() {
        Leg::VenueB
    } else {
        Leg::VenueA
    };
    let oriented: Vec<Decimal> = spreads
        .iter()
        .map(|(spread, _)| match better_venue {
            Leg::VenueA => *spread,
            Leg::VenueB => -*spread,
        })
        .collect();

    let observed_hours = oriented.len() as i64;
    let favorable_sum: Decimal = oriented.iter().copied().sum();
    let annualized_rate_pct = favorable_sum / Decimal::from_i64(observed_hours)
        * Decimal::from_i64(HOURS_PER_YEAR);

    let max_spread = oriented.iter().copied().max().unwrap_or_default();
    let min_spread = oriented.iter().copied().min().unwrap_or_default();

    let zero_or_missing = (window_hours - nonzero_hours).max(0);
    let zero_spread_pct =
        Decimal::from_i64(zero_or_missing) * Decimal::hundred() / Decimal::from_i64(window_hours);

    PeriodStats::Observed(SpreadStats {
        window_hours,
        observed_hours,
        success_rate_pct,
        better_venue,
        annualized_rate_pct,
        max_spread,
        min_spread,
        zero_spread_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn obs(hour: i64, a: &str, b: &str) -> PairedObservation {
        PairedObservation {
            time_ms: TimeMs::new(hour * HOUR_MS),
            rate_a: d(a),
            rate_b: d(b),
        }
    }

    #[test]
    fn test_hourly_series_spreads_period_rate() {
        let settlements = [
            FundingSettlement::new(TimeMs::new(0), d("0.01")),
            FundingSettlement::new(TimeMs::new(8 * HOUR_MS), d("0.08")),
        ];
        let series = hourly_series(&settlements);
        assert_eq!(series.len(), 8);
        assert!(series.values().all(|r| *r == d("0.01")));
        assert_eq!(series.keys().next(), Some(&0));
        assert_eq!(series.keys().last(), Some(&7));
    }

    #[test]
    fn test_hourly_series_skips_long_gaps() {
        let settlements = [
            FundingSettlement::new(TimeMs::new(0), d("0.01")),
            FundingSettlement::new(TimeMs::new(48 * HOUR_MS), d("0.01")),
            FundingSettlement::new(TimeMs::new(49 * HOUR_MS), d("0.02")),
        ];
        let series = hourly_series(&settlements);
        assert_eq!(series.len(), 1);
        assert_eq!(series.get(&48), Some(&d("0.02")));
    }

    #[test]
    fn test_pairing_matches_slots_only() {
        let a: BTreeMap<i64, Decimal> = [(1, d("0.01")), (2, d("0.02"))].into_iter().collect();
        let b: BTreeMap<i64, Decimal> = [(2, d("0.03")), (3, d("0.04"))].into_iter().collect();
        let paired = pair_observations(&a, &b);
        assert_eq!(paired, vec![obs(2, "0.02", "0.03")]);
    }

    #[test]
    fn test_empty_history_is_no_data() {
        assert_eq!(aggregate(&[], 168, 0), PeriodStats::NoData { window_hours: 168 });
    }

    #[test]
    fn test_all_zero_spread_is_no_data() {
        let history = vec![obs(0, "0.01", "0.01"), obs(1, "0.02", "0.02")];
        assert_eq!(aggregate(&history, 168, 2), PeriodStats::NoData { window_hours: 168 });
    }

    #[test]
    fn test_zero_spread_rows_excluded_from_success_rate() {
        let history = vec![
            obs(0, "0.01", "0.02"),
            obs(1, "0.01", "0.01"),
            obs(2, "0.03", "0.02"),
            obs(3, "0.01", "0.03"),
        ];
        let stats = aggregate(&history, 4, 4);
        let stats = stats.observed().unwrap();
        // 2 successes out of 3 non-zero hours.
        assert_eq!(stats.success_rate_pct, d("200") / d("3"));
        assert_eq!(stats.better_venue, Leg::VenueA);
        assert_eq!(stats.observed_hours, 4);
        assert_eq!(stats.zero_spread_pct, d("25"));
    }

    #[test]
    fn test_orientation_flips_for_venue_b() {
        let history = vec![obs(0, "0.05", "0.01"), obs(1, "0.03", "0.04")];
        let stats = aggregate(&history, 2, 2);
        let stats = stats.observed().unwrap();
        assert_eq!(stats.better_venue, Leg::VenueB);
        assert_eq!(stats.max_spread, d("0.04"));
        assert_eq!(stats.min_spread, d("-0.01"));
        assert_eq!(stats.success_rate_pct, d("50"));
    }

    #[test]
    fn test_window_excludes_older_observations() {
        let history = vec![obs(0, "0", "1"), obs(10, "0", "0.01"), obs(11, "0", "0.01")];
        let stats = aggregate(&history, 2, 12);
        let stats = stats.observed().unwrap();
        assert_eq!(stats.observed_hours, 2);
        assert_eq!(stats.max_spread, d("0.01"));
    }

    #[test]
    fn test_non_positive_window_is_no_data() {
        let history = vec![obs(0, "0", "1")];
        assert_eq!(aggregate(&history, 0, 1), PeriodStats::NoData { window_hours: 0 });
    }

    #[test]
    fn test_trailing_gap_counts_as_missing() {
        // Paired data stops 72 hours before the end of a one-week window.
        let history: Vec<PairedObservation> =
            (0..96).map(|h| obs(h, "0.001", "0.002")).collect();
        let stats = aggregate(&history, SEVEN_DAYS_HOURS, SEVEN_DAYS_HOURS);
        let stats = stats.observed().unwrap();
        assert_eq!(stats.observed_hours, 96);
        assert_eq!(
            stats.zero_spread_pct,
            d("7200") / Decimal::from_i64(SEVEN_DAYS_HOURS)
        );
    }

    #[test]
    fn test_observations_at_or_after_end_slot_are_outside_window() {
        let history = vec![obs(3, "0", "0.01"), obs(4, "0", "0.02")];
        let stats = aggregate(&history, 2, 4);
        let stats = stats.observed().unwrap();
        assert_eq!(stats.observed_hours, 1);
        assert_eq!(stats.max_spread, d("0.01"));
        assert_eq!(stats.zero_spread_pct, d("50"));
    }
}
