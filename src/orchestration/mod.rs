//! Cycle orchestration: the periodic refresh, the watch list and the
//! on-demand history analysis.

pub mod history;
pub mod refresh;
pub mod watchlist;

pub use history::{HistoryAnalyzer, HistoryError, HistoryReport};
pub use refresh::{RefreshCycle, RefreshDriver, ViewReceiver};
pub use watchlist::WatchList;
