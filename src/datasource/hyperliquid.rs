//! Hyperliquid API client implementation.

use super::http::send_json;
use super::payload::{decimal_field, i64_field, opt_decimal_field, opt_i64_field, str_field};
use super::{DataSourceError, FundingHistorySource, MetaCache, VenueSource};
use crate::domain::{
    Decimal, FundingQuote, FundingSettlement, Symbol, TimeMs, Venue, VenuePosition, VenueSnapshot,
    HOUR_MS,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Venue key of Hyperliquid's own book inside `predictedFundings`.
const HL_PERP_VENUE: &str = "HlPerp";
/// Maximum rows returned by one `fundingHistory` request.
const HISTORY_PAGE_LIMIT: usize = 500;
const MAX_HISTORY_PAGES: usize = 100;
/// `predictedFundings` covers every coin; one response serves a whole cycle.
const PREDICTED_FUNDINGS_TTL: Duration = Duration::from_secs(5);

/// Hyperliquid data source using the public Info API.
#[derive(Debug)]
pub struct HyperliquidDataSource {
    client: Client,
    base_url: String,
    account: String,
    universe: MetaCache<Vec<Symbol>>,
    predicted: MetaCache<HashMap<Symbol, FundingQuote>>,
}

impl HyperliquidDataSource {
    /// Create a new Hyperliquid data source reading `account`'s positions.
    pub fn new(base_url: String, account: String, meta_ttl: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            account,
            universe: MetaCache::new(meta_ttl),
            predicted: MetaCache::new(PREDICTED_FUNDINGS_TTL),
        }
    }

    async fn post_info(&self, payload: Value) -> Result<Value, DataSourceError> {
        let url = format!("{}/info", self.base_url);
        send_json(|| Ok(self.client.post(&url).json(&payload))).await
    }

    /// Listed perp coins, cached for the metadata TTL.
    async fn universe(&self) -> Result<Arc<Vec<Symbol>>, DataSourceError> {
        self.universe
            .get_or_refresh(|| async {
                let response = self.post_info(serde_json::json!({ "type": "meta" })).await?;
                parse_meta(&response)
            })
            .await
    }
}

#[async_trait]
impl VenueSource for HyperliquidDataSource {
    fn venue(&self) -> Venue {
        Venue::Hyperliquid
    }

    async fn fetch_snapshot(&self) -> Result<VenueSnapshot, DataSourceError> {
        debug!("Fetching clearinghouse state for user={}", self.account);

        let state_payload = serde_json::json!({
            "type": "clearinghouseState",
            "user": self.account
        });
        let mids_payload = serde_json::json!({ "type": "allMids" });

        let (state, mids) = tokio::try_join!(
            self.post_info(state_payload),
            self.post_info(mids_payload)
        )?;

        let mids = parse_all_mids(&mids)?;
        parse_clearinghouse_state(&state, &mids)
    }

    async fn fetch_funding_quote(&self, symbol: &Symbol) -> Result<FundingQuote, DataSourceError> {
        let predicted = self
            .predicted
            .get_or_refresh(|| async {
                debug!("Fetching predicted fundings");
                let response = self
                    .post_info(serde_json::json!({ "type": "predictedFundings" }))
                    .await?;
                parse_predicted_fundings(&response)
            })
            .await?;

        predicted
            .get(symbol)
            .cloned()
            .ok_or_else(|| DataSourceError::Other(format!("No {} prediction for {}", HL_PERP_VENUE, symbol)))
    }

    async fn list_symbols(&self) -> Result<Vec<Symbol>, DataSourceError> {
        Ok(self.universe().await?.as_ref().clone())
    }
}

#[async_trait]
impl FundingHistorySource for HyperliquidDataSource {
    async fn fetch_funding_history(
        &self,
        symbol: &Symbol,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<FundingSettlement>, DataSourceError> {
        debug!(
            "Fetching funding history for coin={}, from_ms={}, to_ms={}",
            symbol, from_ms, to_ms
        );

        let mut settlements = Vec::new();
        let mut start = from_ms;
        for _ in 0..MAX_HISTORY_PAGES {
            if start > to_ms {
                break;
            }
            let payload = serde_json::json!({
                "type": "fundingHistory",
                "coin": symbol.as_str(),
                "startTime": start,
                "endTime": to_ms
            });
            let response = self.post_info(payload).await?;
            let page = parse_funding_history(&response)?;
            let page_len = page.len();
            let Some(last) = page.last().map(|s| s.time_ms.as_i64()) else {
                break;
            };
            settlements.extend(page);
            if page_len < HISTORY_PAGE_LIMIT {
                break;
            }
            start = last + 1;
        }

        settlements.retain(|s| s.time_ms.as_i64() <= to_ms);
        Ok(settlements)
    }
}

fn parse_all_mids(response: &Value) -> Result<HashMap<String, Decimal>, DataSourceError> {
    let mids = response
        .as_object()
        .ok_or_else(|| DataSourceError::ParseError("Expected object response".to_string()))?;

    Ok(mids
        .iter()
        .filter_map(|(coin, px)| {
            px.as_str()
                .and_then(|s| Decimal::from_str_canonical(s).ok())
                .map(|px| (coin.clone(), px))
        })
        .collect())
}

fn parse_clearinghouse_state(
    response: &Value,
    mids: &HashMap<String, Decimal>,
) -> Result<VenueSnapshot, DataSourceError> {
    let positions = response
        .get("assetPositions")
        .and_then(|v| v.as_array())
        .ok_or_else(|| DataSourceError::ParseError("Missing assetPositions field".to_string()))?;

    let mut snapshot = VenueSnapshot::new(Venue::Hyperliquid);
    match response.get("marginSummary").and_then(|s| opt_decimal_field(s, "accountValue")) {
        Some(value) => snapshot = snapshot.with_account_value(value),
        None => warn!("clearinghouseState without marginSummary.accountValue"),
    }
    for entry in positions {
        let Some(position) = entry.get("position") else {
            warn!("Skipping asset position without position body");
            continue;
        };
        match parse_position(position, mids) {
            Ok((coin, pos)) => snapshot = snapshot.with_position(&coin, pos),
            Err(e) => warn!("Failed to parse position: {}", e),
        }
    }
    Ok(snapshot)
}

fn parse_position(
    position: &Value,
    mids: &HashMap<String, Decimal>,
) -> Result<(String, VenuePosition), DataSourceError> {
    let coin = str_field(position, "coin")?.to_string();
    let size = decimal_field(position, "szi")?;
    let entry = opt_decimal_field(position, "entryPx").unwrap_or_default();
    let unrealized = opt_decimal_field(position, "unrealizedPnl").unwrap_or_default();
    let realized = opt_decimal_field(position, "realizedPnl").unwrap_or_default();

    let mut pos = VenuePosition::new(size, entry, mids.get(&coin).copied())
        .with_pnl(unrealized, realized);
    if let Some(value) = opt_decimal_field(position, "positionValue") {
        pos = pos.with_position_value(value);
    }
    Ok((coin, pos))
}

/// Index the `HlPerp` prediction of every coin.
///
/// Entries look like `[coin, [[venue, {fundingRate, nextFundingTime, ...}], ...]]`.
/// Coins without an `HlPerp` entry are left out.
fn parse_predicted_fundings(response: &Value) -> Result<HashMap<Symbol, FundingQuote>, DataSourceError> {
    let entries = response
        .as_array()
        .ok_or_else(|| DataSourceError::ParseError("Expected array response".to_string()))?;

    let mut quotes = HashMap::with_capacity(entries.len());
    for entry in entries.iter().filter_map(|entry| entry.as_array()) {
        let Some(coin) = entry.first().and_then(|c| c.as_str()) else {
            continue;
        };
        let prediction = entry
            .get(1)
            .and_then(|v| v.as_array())
            .and_then(|venues| {
                venues
                    .iter()
                    .filter_map(|v| v.as_array())
                    .find(|v| v.first().and_then(|name| name.as_str()) == Some(HL_PERP_VENUE))
            })
            .and_then(|v| v.get(1))
            .filter(|v| v.is_object());
        let Some(prediction) = prediction else {
            continue;
        };
        match parse_prediction(prediction) {
            Ok(quote) => {
                quotes.insert(Symbol::new(coin.to_string()), quote);
            }
            Err(e) => warn!("Failed to parse predicted funding for {}: {}", coin, e),
        }
    }
    Ok(quotes)
}

fn parse_prediction(prediction: &Value) -> Result<FundingQuote, DataSourceError> {
    let rate = decimal_field(prediction, "fundingRate")?.fraction_to_percent();
    let period_hours = opt_decimal_field(prediction, "fundingIntervalHours").or_else(|| {
        opt_decimal_field(prediction, "fundingIntervalMs")
            .map(|ms| ms / Decimal::from_i64(HOUR_MS))
    });

    let mut quote = FundingQuote::new(rate, period_hours);
    if let Some(next) = opt_i64_field(prediction, "nextFundingTime") {
        quote = quote.with_next_settlement(TimeMs::new(next));
    }
    Ok(quote)
}

fn parse_funding_history(response: &Value) -> Result<Vec<FundingSettlement>, DataSourceError> {
    let rows = response
        .as_array()
        .ok_or_else(|| DataSourceError::ParseError("Expected array response".to_string()))?;

    let mut settlements = Vec::with_capacity(rows.len());
    for row in rows {
        let parsed = i64_field(row, "time").and_then(|time| {
            decimal_field(row, "fundingRate")
                .map(|rate| FundingSettlement::new(TimeMs::new(time), rate.fraction_to_percent()))
        });
        match parsed {
            Ok(settlement) => settlements.push(settlement),
            Err(e) => warn!("Failed to parse funding settlement: {}", e),
        }
    }
    settlements.sort_by_key(|s| s.time_ms);
    Ok(settlements)
}

fn parse_meta(response: &Value) -> Result<Vec<Symbol>, DataSourceError> {
    let universe = response
        .get("universe")
        .and_then(|v| v.as_array())
        .ok_or_else(|| DataSourceError::ParseError("Missing universe field".to_string()))?;

    Ok(universe
        .iter()
        .filter(|asset| !asset.get("isDelisted").and_then(|v| v.as_bool()).unwrap_or(false))
        .filter_map(|asset| asset.get("name").and_then(|v| v.as_str()))
        .map(|name| Symbol::new(name.to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_parse_clearinghouse_state() {
        let state = json!({
            "marginSummary": {"accountValue": "12873.5", "totalNtlPos": "7640.0"},
            "assetPositions": [
                {"position": {"coin": "ETH", "szi": "-2.5", "entryPx": "3000", "positionValue": "7400",
                              "unrealizedPnl": "100", "realizedPnl": "12.5"}, "type": "oneWay"},
                {"position": {"coin": "BTC", "szi": "0.1", "entryPx": "60000", "unrealizedPnl": "-20"}},
                {"position": {"coin": "BAD"}}
            ]
        });
        let mids = parse_all_mids(&json!({"ETH": "2960", "SOL": "150"})).unwrap();

        let snapshot = parse_clearinghouse_state(&state, &mids).unwrap();
        assert_eq!(snapshot.venue, Venue::Hyperliquid);
        assert_eq!(snapshot.positions.len(), 2);
        assert_eq!(snapshot.account_value, Some(d("12873.5")));

        let eth = &snapshot.positions["ETH"];
        assert_eq!(eth.signed_size, d("-2.5"));
        assert_eq!(eth.mark_price, Some(d("2960")));
        assert_eq!(eth.realized_pnl, d("12.5"));
        assert_eq!(eth.position_value, Some(d("7400")));

        let btc = &snapshot.positions["BTC"];
        assert_eq!(btc.mark_price, None);
        assert_eq!(btc.realized_pnl, Decimal::zero());
    }

    fn coin(s: &str) -> Symbol {
        Symbol::new(s.to_string())
    }

    #[test]
    fn test_parse_clearinghouse_state_without_margin_summary() {
        let state = json!({"assetPositions": []});
        let snapshot = parse_clearinghouse_state(&state, &HashMap::new()).unwrap();
        assert_eq!(snapshot.account_value, None);
    }

    #[test]
    fn test_parse_predicted_fundings_indexes_hl_entries() {
        let response = json!([
            ["BTC", [
                ["BinPerp", {"fundingRate": "0.0001", "nextFundingTime": 1733961600000u64}],
                ["HlPerp", {"fundingRate": "0.0000125", "nextFundingTime": 1733958000000u64, "fundingIntervalHours": 1}]
            ]],
            ["ETH", [["HlPerp", {"fundingRate": "-0.00002", "nextFundingTime": 1733958000000u64}]]],
            ["DOGE", [["BybitPerp", {"fundingRate": "0.0001"}]]],
            ["BAD", [["HlPerp", {"nextFundingTime": 1733958000000u64}]]]
        ]);

        let quotes = parse_predicted_fundings(&response).unwrap();
        assert_eq!(quotes.len(), 2);

        let btc = &quotes[&coin("BTC")];
        assert_eq!(btc.rate_per_period, d("0.00125"));
        assert_eq!(btc.period_hours, Some(d("1")));
        assert_eq!(btc.next_settlement, Some(TimeMs::new(1_733_958_000_000)));

        // No interval reported means no interval assumed.
        let eth = &quotes[&coin("ETH")];
        assert_eq!(eth.rate_per_period, d("-0.002"));
        assert_eq!(eth.period_hours, None);

        assert!(!quotes.contains_key(&coin("DOGE")));
        assert!(!quotes.contains_key(&coin("BAD")));
    }

    #[test]
    fn test_parse_predicted_fundings_interval_ms() {
        let response = json!([
            ["SOL", [["HlPerp", {"fundingRate": "0.0001", "fundingIntervalMs": 28800000}]]]
        ]);
        let quotes = parse_predicted_fundings(&response).unwrap();
        let sol = &quotes[&coin("SOL")];
        assert_eq!(sol.period_hours, Some(d("8")));
        assert_eq!(sol.next_settlement, None);

        assert!(parse_predicted_fundings(&json!({})).is_err());
    }

    #[test]
    fn test_parse_funding_history_sorted_percent() {
        let response = json!([
            {"coin": "ETH", "fundingRate": "0.00002", "premium": "0", "time": 7200000},
            {"coin": "ETH", "fundingRate": "-0.0001", "premium": "0", "time": 3600000},
            {"coin": "ETH", "premium": "0", "time": 10800000}
        ]);
        let settlements = parse_funding_history(&response).unwrap();
        assert_eq!(settlements.len(), 2);
        assert_eq!(settlements[0].time_ms, TimeMs::new(3_600_000));
        assert_eq!(settlements[0].rate_pct, d("-0.01"));
        assert_eq!(settlements[1].rate_pct, d("0.002"));
    }

    #[test]
    fn test_parse_meta_skips_delisted() {
        let response = json!({
            "universe": [
                {"name": "BTC", "szDecimals": 5, "maxLeverage": 50},
                {"name": "kPEPE", "szDecimals": 0},
                {"name": "OLD", "szDecimals": 1, "isDelisted": true}
            ]
        });
        let meta = parse_meta(&response).unwrap();
        assert_eq!(
            meta,
            vec![Symbol::new("BTC".to_string()), Symbol::new("kPEPE".to_string())]
        );
    }
}
