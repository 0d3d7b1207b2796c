//! Venue adapters: turn venue HTTP payloads into the typed snapshots and
//! quotes the engine consumes.

use crate::domain::{FundingQuote, FundingSettlement, Symbol, Venue, VenueSnapshot};
use async_trait::async_trait;
use std::fmt;

pub mod bybit;
pub mod http;
pub mod hyperliquid;
pub mod meta_cache;
pub mod mock;
pub mod payload;

pub use bybit::{BybitDataSource, RequestSigner};
pub use hyperliquid::HyperliquidDataSource;
pub use meta_cache::MetaCache;
pub use mock::MockVenueSource;

/// Live position and funding data from one venue.
///
/// Implementations must handle retry/backoff and rate limiting.
#[async_trait]
pub trait VenueSource: Send + Sync + fmt::Debug {
    fn venue(&self) -> Venue;

    /// Fetch every open position on the account.
    async fn fetch_snapshot(&self) -> Result<VenueSnapshot, DataSourceError>;

    /// Fetch the current funding quote for a root symbol.
    ///
    /// The quote carries the settlement interval when the venue reports one;
    /// an unknown interval is left as None rather than defaulted.
    async fn fetch_funding_quote(&self, symbol: &Symbol) -> Result<FundingQuote, DataSourceError>;

    /// Root symbols listed on the venue, served from cached metadata.
    async fn list_symbols(&self) -> Result<Vec<Symbol>, DataSourceError>;
}

/// Historical funding settlements for one venue.
#[async_trait]
pub trait FundingHistorySource: Send + Sync + fmt::Debug {
    /// Settlements in `[from_ms, to_ms]`, ascending by time, rates in percent
    /// per settlement period.
    async fn fetch_funding_history(
        &self,
        symbol: &Symbol,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<FundingSettlement>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 5xx server error)
    HttpError { status: u16, message: String },
    /// Venue-level error inside a successful HTTP response
    ApiError { code: i64, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// The endpoint needs credentials this source was not given
    Unauthenticated,
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ApiError { code, message } => {
                write!(f, "API error {}: {}", code, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::Unauthenticated => write!(f, "Credentials required"),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}
