//! Bybit v5 REST client for linear perpetuals.

use super::http::send_json;
use super::payload::{decimal_field, i64_field, opt_decimal_field, opt_i64_field, str_field};
use super::{DataSourceError, FundingHistorySource, MetaCache, VenueSource};
use crate::domain::{
    Decimal, FundingQuote, FundingSettlement, Symbol, TimeMs, Venue, VenuePosition, VenueSnapshot,
};
use crate::engine::derive_period_hours;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const CATEGORY: &str = "linear";
const HISTORY_PAGE_LIMIT: usize = 200;
const MAX_PAGES: usize = 50;
/// Account types whose settle-coin equity makes up the account value.
const WALLET_ACCOUNT_TYPES: [&str; 2] = ["UNIFIED", "CONTRACT"];

/// Authenticates private Bybit requests.
///
/// Implementations return the headers to attach to a GET carrying `query`.
pub trait RequestSigner: Send + Sync + fmt::Debug {
    fn sign_get(&self, query: &str) -> Result<Vec<(String, String)>, DataSourceError>;
}

/// Bybit data source. Market endpoints are public; positions need a signer.
#[derive(Debug)]
pub struct BybitDataSource {
    client: Client,
    base_url: String,
    settle_coin: String,
    interval_scale: Decimal,
    signer: Option<Arc<dyn RequestSigner>>,
    instruments: MetaCache<Vec<Symbol>>,
}

impl BybitDataSource {
    pub fn new(
        base_url: String,
        settle_coin: String,
        interval_scale: Decimal,
        meta_ttl: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            settle_coin,
            interval_scale,
            signer: None,
            instruments: MetaCache::new(meta_ttl),
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Venue symbol for a root symbol (`BTC` -> `BTCUSDT`).
    pub fn venue_symbol(&self, symbol: &Symbol) -> String {
        format!("{}{}", symbol.as_str(), self.settle_coin)
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        signed: bool,
    ) -> Result<Value, DataSourceError> {
        let signer = if signed {
            Some(self.signer.as_ref().ok_or(DataSourceError::Unauthenticated)?)
        } else {
            None
        };
        let url = format!("{}{}", self.base_url, path);
        let query_string = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let response = send_json(|| {
            let mut request = self.client.get(&url).query(query);
            if let Some(signer) = signer {
                for (name, value) in signer.sign_get(&query_string)? {
                    request = request.header(name, value);
                }
            }
            Ok(request)
        })
        .await?;

        unwrap_envelope(response)
    }

    /// Follow `nextPageCursor` until exhausted, collecting every `list` item.
    async fn get_all_pages(
        &self,
        path: &str,
        query: Vec<(&str, String)>,
        signed: bool,
    ) -> Result<Vec<Value>, DataSourceError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut page_query = query.clone();
            if let Some(cursor) = &cursor {
                page_query.push(("cursor", cursor.clone()));
            }
            let result = self.get(path, &page_query, signed).await?;
            items.extend(result_list(&result)?.iter().cloned());

            cursor = result
                .get("nextPageCursor")
                .and_then(|v| v.as_str())
                .filter(|c| !c.is_empty())
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }
        Ok(items)
    }

    /// Settle-coin equity summed over the wallet account types that answer.
    ///
    /// None when no account type could be read.
    async fn fetch_account_value(&self) -> Option<Decimal> {
        let lookups = WALLET_ACCOUNT_TYPES.iter().map(|account_type| async move {
            let result = self
                .get(
                    "/v5/account/wallet-balance",
                    &[("accountType", account_type.to_string())],
                    true,
                )
                .await
                .and_then(|result| parse_wallet_equity(&result, &self.settle_coin));
            if let Err(e) = &result {
                debug!("No {} wallet balance: {}", account_type, e);
            }
            result.ok()
        });

        let values: Vec<Decimal> = futures::future::join_all(lookups)
            .await
            .into_iter()
            .flatten()
            .collect();
        if values.is_empty() {
            warn!("No Bybit wallet balance could be read");
            return None;
        }
        Some(values.into_iter().sum())
    }

    async fn fetch_period_hours(&self, venue_symbol: &str) -> Result<Option<Decimal>, DataSourceError> {
        let result = self
            .get(
                "/v5/market/funding/history",
                &[
                    ("category", CATEGORY.to_string()),
                    ("symbol", venue_symbol.to_string()),
                    ("limit", "2".to_string()),
                ],
                false,
            )
            .await?;
        let timestamps: Vec<TimeMs> = result_list(&result)?
            .iter()
            .filter_map(|row| opt_i64_field(row, "fundingRateTimestamp"))
            .map(TimeMs::new)
            .collect();

        match derive_period_hours(&timestamps) {
            Ok(hours) => Ok(Some(hours * self.interval_scale)),
            Err(reason) => {
                debug!("No settlement interval for {}: {}", venue_symbol, reason);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl VenueSource for BybitDataSource {
    fn venue(&self) -> Venue {
        Venue::Bybit
    }

    async fn fetch_snapshot(&self) -> Result<VenueSnapshot, DataSourceError> {
        debug!("Fetching linear positions settled in {}", self.settle_coin);

        let (items, account_value) = tokio::join!(
            self.get_all_pages(
                "/v5/position/list",
                vec![
                    ("category", CATEGORY.to_string()),
                    ("settleCoin", self.settle_coin.clone()),
                    ("limit", "200".to_string()),
                ],
                true,
            ),
            self.fetch_account_value()
        );
        let items = items?;

        let mut snapshot = VenueSnapshot::new(Venue::Bybit);
        if let Some(value) = account_value {
            snapshot = snapshot.with_account_value(value);
        }
        for item in &items {
            match parse_position(item) {
                Ok((symbol, pos)) => snapshot = snapshot.with_position(&symbol, pos),
                Err(e) => warn!("Failed to parse position: {}", e),
            }
        }
        Ok(snapshot)
    }

    async fn fetch_funding_quote(&self, symbol: &Symbol) -> Result<FundingQuote, DataSourceError> {
        let venue_symbol = self.venue_symbol(symbol);
        debug!("Fetching ticker for symbol={}", venue_symbol);

        let ticker_query = [
            ("category", CATEGORY.to_string()),
            ("symbol", venue_symbol.clone()),
        ];
        let (ticker, period_hours) = tokio::try_join!(
            self.get("/v5/market/tickers", &ticker_query, false),
            self.fetch_period_hours(&venue_symbol)
        )?;

        parse_ticker(&ticker, &venue_symbol, period_hours)
    }

    async fn list_symbols(&self) -> Result<Vec<Symbol>, DataSourceError> {
        let symbols = self
            .instruments
            .get_or_refresh(|| async {
                let items = self
                    .get_all_pages(
                        "/v5/market/instruments-info",
                        vec![
                            ("category", CATEGORY.to_string()),
                            ("limit", "1000".to_string()),
                        ],
                        false,
                    )
                    .await?;
                Ok(parse_instruments(&items, &self.settle_coin))
            })
            .await?;
        Ok(symbols.as_ref().clone())
    }
}

#[async_trait]
impl FundingHistorySource for BybitDataSource {
    async fn fetch_funding_history(
        &self,
        symbol: &Symbol,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<FundingSettlement>, DataSourceError> {
        let venue_symbol = self.venue_symbol(symbol);
        debug!(
            "Fetching funding history for symbol={}, from_ms={}, to_ms={}",
            venue_symbol, from_ms, to_ms
        );

        // Pages come newest first; walk endTime backwards.
        let mut settlements = Vec::new();
        let mut end = to_ms;
        for _ in 0..MAX_PAGES {
            if end < from_ms {
                break;
            }
            let result = self
                .get(
                    "/v5/market/funding/history",
                    &[
                        ("category", CATEGORY.to_string()),
                        ("symbol", venue_symbol.clone()),
                        ("startTime", from_ms.to_string()),
                        ("endTime", end.to_string()),
                        ("limit", HISTORY_PAGE_LIMIT.to_string()),
                    ],
                    false,
                )
                .await?;
            let page = parse_funding_history(result_list(&result)?);
            let page_len = page.len();
            let Some(oldest) = page.iter().map(|s| s.time_ms.as_i64()).min() else {
                break;
            };
            settlements.extend(page);
            if page_len < HISTORY_PAGE_LIMIT {
                break;
            }
            end = oldest - 1;
        }

        settlements.retain(|s| (from_ms..=to_ms).contains(&s.time_ms.as_i64()));
        settlements.sort_by_key(|s| s.time_ms);
        settlements.dedup_by_key(|s| s.time_ms);
        Ok(settlements)
    }
}

/// Unwrap the `{retCode, retMsg, result}` envelope.
fn unwrap_envelope(mut response: Value) -> Result<Value, DataSourceError> {
    let code = i64_field(&response, "retCode")?;
    if code != 0 {
        let message = response
            .get("retMsg")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        return Err(DataSourceError::ApiError { code, message });
    }
    response
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| DataSourceError::ParseError("Missing result field".to_string()))
}

fn result_list(result: &Value) -> Result<&Vec<Value>, DataSourceError> {
    result
        .get("list")
        .and_then(|v| v.as_array())
        .ok_or_else(|| DataSourceError::ParseError("Missing list field".to_string()))
}

fn parse_position(item: &Value) -> Result<(String, VenuePosition), DataSourceError> {
    let symbol = str_field(item, "symbol")?.to_string();
    let size = decimal_field(item, "size")?;
    let signed_size = match item.get("side").and_then(|v| v.as_str()) {
        Some("Buy") => size,
        Some("Sell") => -size,
        _ => Decimal::zero(),
    };
    let entry = opt_decimal_field(item, "avgPrice").unwrap_or_default();
    let unrealized = opt_decimal_field(item, "unrealisedPnl").unwrap_or_default();
    let realized = opt_decimal_field(item, "cumRealisedPnl").unwrap_or_default();

    let mut pos = VenuePosition::new(signed_size, entry, opt_decimal_field(item, "markPrice"))
        .with_pnl(unrealized, realized);
    if let Some(value) = opt_decimal_field(item, "positionValue") {
        pos = pos.with_position_value(value);
    }
    Ok((symbol, pos))
}

/// Equity held in `coin` across every account in a wallet-balance result.
fn parse_wallet_equity(result: &Value, coin: &str) -> Result<Decimal, DataSourceError> {
    let mut equity = Decimal::zero();
    for account in result_list(result)? {
        let coins = account
            .get("coin")
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        for entry in coins {
            if entry.get("coin").and_then(|v| v.as_str()) == Some(coin) {
                equity = equity + opt_decimal_field(entry, "equity").unwrap_or_default();
            }
        }
    }
    Ok(equity)
}

fn parse_ticker(
    result: &Value,
    venue_symbol: &str,
    period_hours: Option<Decimal>,
) -> Result<FundingQuote, DataSourceError> {
    let ticker = result_list(result)?
        .iter()
        .find(|t| t.get("symbol").and_then(|s| s.as_str()) == Some(venue_symbol))
        .ok_or_else(|| DataSourceError::Other(format!("No ticker for {}", venue_symbol)))?;

    let rate = decimal_field(ticker, "fundingRate")?.fraction_to_percent();
    let mut quote = FundingQuote::new(rate, period_hours);
    if let Some(next) = opt_i64_field(ticker, "nextFundingTime").filter(|t| *t > 0) {
        quote = quote.with_next_settlement(TimeMs::new(next));
    }
    Ok(quote)
}

fn parse_funding_history(rows: &[Value]) -> Vec<FundingSettlement> {
    rows.iter()
        .filter_map(|row| {
            let parsed = i64_field(row, "fundingRateTimestamp").and_then(|time| {
                decimal_field(row, "fundingRate")
                    .map(|rate| FundingSettlement::new(TimeMs::new(time), rate.fraction_to_percent()))
            });
            parsed
                .map_err(|e| warn!("Failed to parse funding settlement: {}", e))
                .ok()
        })
        .collect()
}

fn parse_instruments(items: &[Value], settle_coin: &str) -> Vec<Symbol> {
    items
        .iter()
        .filter(|i| i.get("settleCoin").and_then(|v| v.as_str()) == Some(settle_coin))
        .filter(|i| i.get("status").and_then(|v| v.as_str()) == Some("Trading"))
        .filter(|i| {
            i.get("contractType")
                .and_then(|v| v.as_str())
                .map_or(true, |t| t == "LinearPerpetual")
        })
        .filter_map(|i| i.get("symbol").and_then(|v| v.as_str()))
        .map(Symbol::canonical)
        .collect()
}
