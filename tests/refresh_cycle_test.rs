use hedgeview::datasource::{DataSourceError, MockVenueSource};
use hedgeview::domain::{Decimal, FundingQuote, Symbol, Venue, VenuePosition, VenueSnapshot};
use hedgeview::engine::{InvalidEstimate, LegStatus};
use hedgeview::orchestration::{RefreshCycle, RefreshDriver, WatchList};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn sym(s: &str) -> Symbol {
    Symbol::new(s.to_string())
}

#[tokio::test]
async fn watched_symbol_added_between_cycles_appears_next_cycle() {
    let a = MockVenueSource::new(Venue::Hyperliquid)
        .with_quote("ETH", FundingQuote::new(d("0.001"), Some(d("1"))));
    let b = MockVenueSource::new(Venue::Bybit)
        .with_quote("ETH", FundingQuote::new(d("0.008"), Some(d("8"))));
    let watchlist = WatchList::default();
    let cycle = RefreshCycle::new(Arc::new(a), Arc::new(b), watchlist.clone());

    let first = cycle.run_once().await;
    assert!(first.funding.is_empty());

    assert!(watchlist.add(sym("ETH")).await);
    let second = cycle.run_once().await;
    assert_eq!(second.funding.len(), 1);
    let est = second.funding[0].estimate.as_ref().unwrap();
    assert!(est.hedged_notional.is_zero());
    assert!(est.est_pnl_per_hour.is_zero());
}

#[tokio::test]
async fn partial_failure_keeps_healthy_venue_rows() {
    let a = MockVenueSource::new(Venue::Hyperliquid)
        .with_snapshot(
            VenueSnapshot::new(Venue::Hyperliquid)
                .with_position("BTC", VenuePosition::new(d("-1"), d("60000"), Some(d("60100"))))
                .with_position("ETH", VenuePosition::new(d("5"), d("3000"), None)),
        )
        .with_quote("BTC", FundingQuote::new(d("0.001"), Some(d("1"))))
        .with_quote("ETH", FundingQuote::new(d("0.002"), Some(d("1"))));
    let b = MockVenueSource::new(Venue::Bybit)
        .with_snapshot_error(DataSourceError::HttpError {
            status: 503,
            message: "Server error".to_string(),
        })
        .with_quote("BTC", FundingQuote::new(d("0.01"), None))
        .with_quote("ETH", FundingQuote::new(d("0.01"), Some(d("8"))));

    let cycle = RefreshCycle::new(Arc::new(a), Arc::new(b), WatchList::default());
    let view = cycle.run_once().await;

    assert!(view.venue_b.error.as_deref().unwrap().contains("503"));
    assert_eq!(view.rows.len(), 2);
    assert!(view
        .rows
        .iter()
        .all(|row| row.venue_a.status == LegStatus::Open && row.venue_b.status == LegStatus::Unavailable));

    let btc = view.funding.iter().find(|r| r.symbol == sym("BTC")).unwrap();
    // Unknown interval on B is reported as invalid, not zero.
    assert!(btc.rate_b.is_err());
    assert!(matches!(btc.estimate, Err(InvalidEstimate::Rate { .. })));

    let eth = view.funding.iter().find(|r| r.symbol == sym("ETH")).unwrap();
    assert!(eth.rate_b.is_ok());
    assert!(matches!(eth.estimate, Err(InvalidEstimate::MissingMark { .. })));
}

#[tokio::test]
async fn driver_publishes_and_stops() {
    let a = MockVenueSource::new(Venue::Hyperliquid);
    let b = MockVenueSource::new(Venue::Bybit);
    let cycle = Arc::new(RefreshCycle::new(
        Arc::new(a.clone()),
        Arc::new(b),
        WatchList::default(),
    ));
    let mut rx = cycle.subscribe();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let driver = RefreshDriver::new(cycle, Duration::from_millis(10));
    let handle = tokio::spawn(driver.run(async move {
        let _ = stop_rx.await;
    }));

    rx.wait_for(|view| view.is_some()).await.unwrap();
    stop_tx.send(()).unwrap();
    handle.await.unwrap();
    assert!(a.snapshot_calls() >= 1);
}
