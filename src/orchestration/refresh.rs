use super::WatchList;
use crate::datasource::VenueSource;
use crate::domain::{Symbol, TimeMs, VenueFeed};
use crate::engine::{compose_view, reconcile, symbols_of_interest, CrossVenueView, InvalidRate, QuoteOutcome};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Latest published view; None until the first cycle completes.
pub type ViewReceiver = watch::Receiver<Option<Arc<CrossVenueView>>>;

/// One snapshot-reconcile-estimate pass over both venues.
#[derive(Debug)]
pub struct RefreshCycle {
    venue_a: Arc<dyn VenueSource>,
    venue_b: Arc<dyn VenueSource>,
    watchlist: WatchList,
    publisher: watch::Sender<Option<Arc<CrossVenueView>>>,
}

impl RefreshCycle {
    pub fn new(
        venue_a: Arc<dyn VenueSource>,
        venue_b: Arc<dyn VenueSource>,
        watchlist: WatchList,
    ) -> Self {
        let (publisher, _) = watch::channel(None);
        Self {
            venue_a,
            venue_b,
            watchlist,
            publisher,
        }
    }

    pub fn subscribe(&self) -> ViewReceiver {
        self.publisher.subscribe()
    }

    /// Run one cycle and publish its view.
    ///
    /// Venue and quote failures are folded into the view; the cycle itself
    /// never fails. Nothing is published if the future is dropped early.
    pub async fn run_once(&self) -> Arc<CrossVenueView> {
        let watched = self.watchlist.snapshot().await;

        let (feed_a, feed_b) = tokio::join!(
            fetch_feed(self.venue_a.as_ref()),
            fetch_feed(self.venue_b.as_ref())
        );

        let rows = reconcile(&feed_a, &feed_b);
        let symbols = symbols_of_interest(&rows, &watched);
        debug!(
            "Fetching funding for {} symbols ({} with positions)",
            symbols.len(),
            rows.len()
        );

        let (quotes_a, quotes_b) = tokio::join!(
            fetch_quotes(self.venue_a.as_ref(), &symbols),
            fetch_quotes(self.venue_b.as_ref(), &symbols)
        );

        let view = Arc::new(compose_view(
            TimeMs::now(),
            &feed_a,
            &feed_b,
            rows,
            &symbols,
            &quotes_a,
            &quotes_b,
        ));

        let invalid = view.funding.iter().filter(|row| row.estimate.is_err()).count();
        info!(
            "Published view: {} positions, {} funding rows ({} invalid), total net PnL {}",
            view.rows.len(),
            view.funding.len(),
            invalid,
            view.total_net_pnl
        );
        self.publisher.send_replace(Some(view.clone()));
        view
    }
}

async fn fetch_feed(source: &dyn VenueSource) -> VenueFeed {
    match source.fetch_snapshot().await {
        Ok(snapshot) => VenueFeed::Available(snapshot),
        Err(e) => {
            warn!("Venue {} unavailable: {}", source.venue(), e);
            VenueFeed::Unavailable {
                venue: source.venue(),
                reason: e.to_string(),
            }
        }
    }
}

async fn fetch_quotes(
    source: &dyn VenueSource,
    symbols: &BTreeSet<Symbol>,
) -> BTreeMap<Symbol, QuoteOutcome> {
    let fetches = symbols.iter().map(|symbol| async move {
        let outcome = source.fetch_funding_quote(symbol).await.map_err(|e| {
            warn!("Funding quote for {} on {} unavailable: {}", symbol, source.venue(), e);
            InvalidRate::QuoteUnavailable(e.to_string())
        });
        (symbol.clone(), outcome)
    });
    join_all(fetches).await.into_iter().collect()
}

/// Runs refresh cycles on a fixed interval until shutdown.
#[derive(Debug)]
pub struct RefreshDriver {
    cycle: Arc<RefreshCycle>,
    interval: Duration,
}

impl RefreshDriver {
    pub fn new(cycle: Arc<RefreshCycle>, interval: Duration) -> Self {
        Self { cycle, interval }
    }

    /// Cycles never overlap: each one is awaited before the next tick is
    /// taken, and ticks missed meanwhile are skipped. A shutdown arriving
    /// mid-cycle abandons that cycle unpublished.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown during refresh cycle; discarding it");
                    break;
                }
                _ = self.cycle.run_once() => {}
            }
        }
        info!("Refresh driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{DataSourceError, MockVenueSource};
    use crate::domain::{Decimal, FundingQuote, Venue, VenuePosition, VenueSnapshot};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn sym(s: &str) -> Symbol {
        Symbol::new(s.to_string())
    }

    #[tokio::test]
    async fn test_run_once_publishes_view() {
        let a = MockVenueSource::new(Venue::Hyperliquid)
            .with_snapshot(
                VenueSnapshot::new(Venue::Hyperliquid)
                    .with_position("BTC", VenuePosition::new(d("-1"), d("100"), Some(d("100")))),
            )
            .with_quote("BTC", FundingQuote::new(d("0.01"), Some(d("1"))));
        let b = MockVenueSource::new(Venue::Bybit)
            .with_snapshot(
                VenueSnapshot::new(Venue::Bybit)
                    .with_position("BTCUSDT", VenuePosition::new(d("1"), d("100"), Some(d("100")))),
            )
            .with_quote("BTC", FundingQuote::new(d("0.08"), Some(d("8"))));

        let cycle = RefreshCycle::new(Arc::new(a), Arc::new(b), WatchList::default());
        let rx = cycle.subscribe();
        assert!(rx.borrow().is_none());

        let view = cycle.run_once().await;
        assert_eq!(view.rows.len(), 1);
        let estimate = view.funding[0].estimate.as_ref().unwrap();
        assert_eq!(estimate.net_rate_per_hour, d("0"));
        assert_eq!(rx.borrow().as_ref().map(|v| v.rows.len()), Some(1));
    }

    #[tokio::test]
    async fn test_venue_failure_does_not_abort_cycle() {
        let a = MockVenueSource::new(Venue::Hyperliquid)
            .with_snapshot(
                VenueSnapshot::new(Venue::Hyperliquid)
                    .with_position("ETH", VenuePosition::new(d("2"), d("3000"), Some(d("3000")))),
            )
            .with_quote("ETH", FundingQuote::new(d("0.001"), Some(d("1"))));
        let b = MockVenueSource::new(Venue::Bybit)
            .with_snapshot_error(DataSourceError::Unauthenticated)
            .with_quote_error("ETH", DataSourceError::RateLimited);

        let cycle = RefreshCycle::new(Arc::new(a), Arc::new(b), WatchList::new(vec![sym("SOL")]));
        let view = cycle.run_once().await;

        assert!(view.venue_a.error.is_none());
        assert!(view.venue_b.error.is_some());
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.funding.len(), 2);
        assert!(view.funding.iter().all(|row| row.estimate.is_err()));
    }

    #[tokio::test]
    async fn test_driver_stops_on_shutdown() {
        let a = MockVenueSource::new(Venue::Hyperliquid);
        let b = MockVenueSource::new(Venue::Bybit);
        let cycle = Arc::new(RefreshCycle::new(
            Arc::new(a.clone()),
            Arc::new(b),
            WatchList::default(),
        ));
        let rx = cycle.subscribe();
        let (tx, mut shutdown_rx) = watch::channel(false);

        let driver = RefreshDriver::new(cycle, Duration::from_secs(3600));
        let handle = tokio::spawn(driver.run(async move {
            let _ = shutdown_rx.changed().await;
        }));

        // The first tick fires immediately.
        let mut wait_rx = rx.clone();
        wait_rx.wait_for(|view| view.is_some()).await.unwrap();
        assert_eq!(a.snapshot_calls(), 1);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
