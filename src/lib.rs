pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{
    BybitDataSource, DataSourceError, FundingHistorySource, HyperliquidDataSource, MockVenueSource,
    VenueSource,
};
pub use domain::{
    Decimal, FundingQuote, FundingSettlement, Leg, PositionSide, Symbol, TimeMs, Venue, VenueFeed,
    VenuePosition, VenueSnapshot,
};
pub use engine::{CrossVenueView, HedgeEstimate, InvalidEstimate, InvalidRate, PeriodStats};
pub use error::AppError;
pub use orchestration::{HistoryAnalyzer, RefreshCycle, RefreshDriver, WatchList};
