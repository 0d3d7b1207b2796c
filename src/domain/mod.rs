//! Domain types shared by the venue adapters and the funding engine.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper (percent rates)
//! - Primitives: TimeMs, Symbol, PositionSide
//! - Venue identifiers and the A/B legs of a hedged pair
//! - Snapshot and funding-quote structs the engine consumes

pub mod decimal;
pub mod funding;
pub mod position;
pub mod primitives;
pub mod venue;

pub use decimal::Decimal;
pub use funding::{FundingQuote, FundingSettlement, PairedObservation};
pub use position::{VenueFeed, VenuePosition, VenueSnapshot};
pub use primitives::{PositionSide, Symbol, TimeMs, HOUR_MS};
pub use venue::{Leg, Venue};
