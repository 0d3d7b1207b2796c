//! Mock venue source for testing without network calls.

use super::{DataSourceError, FundingHistorySource, VenueSource};
use crate::domain::{FundingQuote, FundingSettlement, Symbol, Venue, VenueSnapshot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock venue that returns predefined positions, quotes and history.
#[derive(Debug, Clone)]
pub struct MockVenueSource {
    venue: Venue,
    snapshot: VenueSnapshot,
    quotes: HashMap<Symbol, FundingQuote>,
    history: HashMap<Symbol, Vec<FundingSettlement>>,
    listed: Vec<Symbol>,
    snapshot_error: Option<DataSourceError>,
    quote_errors: HashMap<Symbol, DataSourceError>,
    history_error: Option<DataSourceError>,
    list_error: Option<DataSourceError>,
    snapshot_calls: Arc<AtomicUsize>,
}

impl MockVenueSource {
    /// Create a new mock with no positions for `venue`.
    pub fn new(venue: Venue) -> Self {
        Self {
            venue,
            snapshot: VenueSnapshot::new(venue),
            quotes: HashMap::new(),
            history: HashMap::new(),
            listed: Vec::new(),
            snapshot_error: None,
            quote_errors: HashMap::new(),
            history_error: None,
            list_error: None,
            snapshot_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the snapshot returned by fetch_snapshot.
    pub fn with_snapshot(mut self, snapshot: VenueSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Set the funding quote for a symbol; the symbol is also listed.
    pub fn with_quote(mut self, symbol: &str, quote: FundingQuote) -> Self {
        let symbol = Symbol::new(symbol.to_string());
        self.list(symbol.clone());
        self.quotes.insert(symbol, quote);
        self
    }

    /// Set the settlement history for a symbol; the symbol is also listed.
    pub fn with_history(mut self, symbol: &str, settlements: Vec<FundingSettlement>) -> Self {
        let symbol = Symbol::new(symbol.to_string());
        self.list(symbol.clone());
        self.history.insert(symbol, settlements);
        self
    }

    /// List a symbol without quote data.
    pub fn with_listed(mut self, symbol: &str) -> Self {
        self.list(Symbol::new(symbol.to_string()));
        self
    }

    /// Make fetch_snapshot fail.
    pub fn with_snapshot_error(mut self, error: DataSourceError) -> Self {
        self.snapshot_error = Some(error);
        self
    }

    /// Make fetch_funding_quote fail for one symbol.
    pub fn with_quote_error(mut self, symbol: &str, error: DataSourceError) -> Self {
        self.quote_errors.insert(Symbol::new(symbol.to_string()), error);
        self
    }

    /// Make fetch_funding_history fail.
    pub fn with_history_error(mut self, error: DataSourceError) -> Self {
        self.history_error = Some(error);
        self
    }

    /// Make list_symbols fail.
    pub fn with_list_error(mut self, error: DataSourceError) -> Self {
        self.list_error = Some(error);
        self
    }

    /// Number of fetch_snapshot calls so far, shared across clones.
    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    fn list(&mut self, symbol: Symbol) {
        if !self.listed.contains(&symbol) {
            self.listed.push(symbol);
        }
    }
}

#[async_trait]
impl VenueSource for MockVenueSource {
    fn venue(&self) -> Venue {
        self.venue
    }

    async fn fetch_snapshot(&self) -> Result<VenueSnapshot, DataSourceError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        match &self.snapshot_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.snapshot.clone()),
        }
    }

    async fn fetch_funding_quote(&self, symbol: &Symbol) -> Result<FundingQuote, DataSourceError> {
        if let Some(err) = self.quote_errors.get(symbol) {
            return Err(err.clone());
        }
        self.quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataSourceError::Other(format!("No funding for {}", symbol)))
    }

    async fn list_symbols(&self) -> Result<Vec<Symbol>, DataSourceError> {
        match &self.list_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.listed.clone()),
        }
    }
}

#[async_trait]
impl FundingHistorySource for MockVenueSource {
    async fn fetch_funding_history(
        &self,
        symbol: &Symbol,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<FundingSettlement>, DataSourceError> {
        if let Some(err) = &self.history_error {
            return Err(err.clone());
        }
        let mut settlements: Vec<FundingSettlement> = self
            .history
            .get(symbol)
            .map(|all| {
                all.iter()
                    .filter(|s| (from_ms..=to_ms).contains(&s.time_ms.as_i64()))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        settlements.sort_by_key(|s| s.time_ms);
        Ok(settlements)
    }
}
