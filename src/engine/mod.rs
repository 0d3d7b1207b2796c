//! Pure computation engine for the cross-venue funding view.
//!
//! Nothing in here performs I/O or reads the clock; callers hand in frozen
//! snapshots and quotes and get back plain values.

pub mod estimator;
pub mod normalizer;
pub mod reconciler;
pub mod stats;
pub mod view;

pub use estimator::{estimate, EstimateOutcome, HedgeEstimate, InvalidEstimate, Receiver};
pub use normalizer::{derive_period_hours, normalize, InvalidRate, NormalizedRate, RateOutcome};
pub use reconciler::{reconcile, CombinedRow, LegStatus, LegView};
pub use stats::{aggregate, hourly_series, pair_observations, PeriodStats, SpreadStats};
pub use view::{compose_view, symbols_of_interest, CrossVenueView, FundingRow, QuoteOutcome, VenueStatus};
