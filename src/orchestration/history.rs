use crate::datasource::{DataSourceError, FundingHistorySource};
use crate::domain::{Leg, Symbol, TimeMs};
use crate::engine::stats::{MAX_SETTLEMENT_PERIOD_HOURS, SEVEN_DAYS_HOURS, THIRTY_DAYS_HOURS};
use crate::engine::{aggregate, hourly_series, pair_observations, PeriodStats};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("funding history unavailable on {leg}: {source}")]
    Unavailable {
        leg: Leg,
        #[source]
        source: DataSourceError,
    },
}

/// 7-day and 30-day spread statistics for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryReport {
    pub symbol: Symbol,
    pub as_of: TimeMs,
    /// Hours with a per-hour rate on both venues.
    pub paired_hours: usize,
    pub seven_day: PeriodStats,
    pub thirty_day: PeriodStats,
}

#[derive(Debug, Clone)]
pub struct HistoryAnalyzer {
    venue_a: Arc<dyn FundingHistorySource>,
    venue_b: Arc<dyn FundingHistorySource>,
}

impl HistoryAnalyzer {
    pub fn new(venue_a: Arc<dyn FundingHistorySource>, venue_b: Arc<dyn FundingHistorySource>) -> Self {
        Self { venue_a, venue_b }
    }

    pub async fn analyze(&self, symbol: &Symbol, as_of: TimeMs) -> Result<HistoryReport, HistoryError> {
        // Reach one maximal settlement period further back so the first
        // in-window settlement has a predecessor to derive its period from.
        let from_ms = as_of
            .minus_hours(THIRTY_DAYS_HOURS + MAX_SETTLEMENT_PERIOD_HOURS)
            .as_i64();
        let to_ms = as_of.as_i64();

        let (settlements_a, settlements_b) = tokio::try_join!(
            async {
                self.venue_a
                    .fetch_funding_history(symbol, from_ms, to_ms)
                    .await
                    .map_err(|source| HistoryError::Unavailable { leg: Leg::VenueA, source })
            },
            async {
                self.venue_b
                    .fetch_funding_history(symbol, from_ms, to_ms)
                    .await
                    .map_err(|source| HistoryError::Unavailable { leg: Leg::VenueB, source })
            }
        )?;
        debug!(
            "History for {}: {} settlements on A, {} on B",
            symbol,
            settlements_a.len(),
            settlements_b.len()
        );

        let paired = pair_observations(&hourly_series(&settlements_a), &hourly_series(&settlements_b));
        // Windows close at the hour containing `as_of`, so a venue that went
        // quiet shows up as missing hours rather than a shorter window.
        let end_slot = as_of.hour_slot();

        Ok(HistoryReport {
            symbol: symbol.clone(),
            as_of,
            paired_hours: paired.len(),
            seven_day: aggregate(&paired, SEVEN_DAYS_HOURS, end_slot),
            thirty_day: aggregate(&paired, THIRTY_DAYS_HOURS, end_slot),
        })
    }
}
