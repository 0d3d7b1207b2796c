//! Pure assembly of one refresh cycle's output from frozen inputs.

use super::estimator::{estimate, EstimateOutcome};
use super::normalizer::{normalize, InvalidRate, RateOutcome};
use super::reconciler::CombinedRow;
use crate::domain::{Decimal, FundingQuote, Symbol, TimeMs, Venue, VenueFeed};
use std::collections::{BTreeMap, BTreeSet};

/// A fetched quote, or the reason it could not be fetched.
pub type QuoteOutcome = Result<FundingQuote, InvalidRate>;

/// Health of one venue for the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueStatus {
    pub venue: Venue,
    /// None when the snapshot was read successfully.
    pub error: Option<String>,
    pub account_value: Option<Decimal>,
}

impl VenueStatus {
    pub fn of(feed: &VenueFeed) -> Self {
        match feed {
            VenueFeed::Available(snapshot) => Self {
                venue: snapshot.venue,
                error: None,
                account_value: snapshot.account_value,
            },
            VenueFeed::Unavailable { venue, reason } => Self {
                venue: *venue,
                error: Some(reason.clone()),
                account_value: None,
            },
        }
    }
}

/// Funding view for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingRow {
    pub symbol: Symbol,
    pub rate_a: RateOutcome,
    pub rate_b: RateOutcome,
    pub next_settlement_a: Option<TimeMs>,
    pub next_settlement_b: Option<TimeMs>,
    pub estimate: EstimateOutcome,
}

/// Everything one refresh cycle publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossVenueView {
    pub generated_at: TimeMs,
    pub venue_a: VenueStatus,
    pub venue_b: VenueStatus,
    /// Symbols with a position on at least one venue, sorted.
    pub rows: Vec<CombinedRow>,
    /// Position symbols plus watched symbols, sorted.
    pub funding: Vec<FundingRow>,
    pub total_net_pnl: Decimal,
    /// Sum of both venues' account values; None unless both are known.
    pub total_account_value: Option<Decimal>,
}

/// Symbols that need funding quotes this cycle.
pub fn symbols_of_interest(
    rows: &BTreeMap<Symbol, CombinedRow>,
    watched: &[Symbol],
) -> BTreeSet<Symbol> {
    rows.keys().chain(watched.iter()).cloned().collect()
}

fn quote_rate(quote: Option<&QuoteOutcome>) -> (RateOutcome, Option<TimeMs>) {
    match quote {
        Some(Ok(quote)) => (normalize(quote), quote.next_settlement),
        Some(Err(reason)) => (Err(reason.clone()), None),
        None => (
            Err(InvalidRate::QuoteUnavailable("not requested".to_string())),
            None,
        ),
    }
}

/// Build the cycle's view from reconciled rows and both venues' quotes.
pub fn compose_view(
    generated_at: TimeMs,
    feed_a: &VenueFeed,
    feed_b: &VenueFeed,
    rows: BTreeMap<Symbol, CombinedRow>,
    symbols: &BTreeSet<Symbol>,
    quotes_a: &BTreeMap<Symbol, QuoteOutcome>,
    quotes_b: &BTreeMap<Symbol, QuoteOutcome>,
) -> CrossVenueView {
    let funding = symbols
        .iter()
        .map(|symbol| {
            let (rate_a, next_settlement_a) = quote_rate(quotes_a.get(symbol));
            let (rate_b, next_settlement_b) = quote_rate(quotes_b.get(symbol));
            let row = rows
                .get(symbol)
                .cloned()
                .unwrap_or_else(|| CombinedRow::empty(symbol.clone()));
            let estimate = estimate(&row, &rate_a, &rate_b);
            FundingRow {
                symbol: symbol.clone(),
                rate_a,
                rate_b,
                next_settlement_a,
                next_settlement_b,
                estimate,
            }
        })
        .collect();

    let rows: Vec<CombinedRow> = rows.into_values().collect();
    let total_net_pnl = rows.iter().map(|r| r.total_net_pnl).sum();

    let venue_a = VenueStatus::of(feed_a);
    let venue_b = VenueStatus::of(feed_b);
    let total_account_value = venue_a
        .account_value
        .zip(venue_b.account_value)
        .map(|(a, b)| a + b);

    CrossVenueView {
        generated_at,
        venue_a,
        venue_b,
        rows,
        funding,
        total_net_pnl,
        total_account_value,
    }
}
