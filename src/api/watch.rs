use crate::api::AppState;
use crate::datasource::{DataSourceError, VenueSource};
use crate::domain::Symbol;
use crate::error::AppError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct WatchRequest {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchListResponse {
    pub symbols: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchResponse {
    pub symbol: String,
    pub added: bool,
}

pub async fn get_watch(State(state): State<AppState>) -> Json<WatchListResponse> {
    let symbols = state
        .watchlist
        .snapshot()
        .await
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    Json(WatchListResponse { symbols })
}

/// The venue's own spelling of `symbol`, matched case-insensitively.
async fn listed_as(source: &dyn VenueSource, symbol: &Symbol) -> Result<Option<Symbol>, DataSourceError> {
    let listed = source.list_symbols().await?;
    if listed.contains(symbol) {
        return Ok(Some(symbol.clone()));
    }
    Ok(listed
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(symbol.as_str())))
}

/// Watch a symbol. It must be listed on at least one venue; venue A's
/// spelling wins when both list it.
pub async fn add_watch(
    State(state): State<AppState>,
    Json(request): Json<WatchRequest>,
) -> Result<(StatusCode, Json<WatchResponse>), AppError> {
    let raw = request.symbol.trim();
    if raw.is_empty() {
        return Err(AppError::BadRequest("symbol is required".into()));
    }
    let symbol = Symbol::canonical(raw);

    if state.watchlist.contains(&symbol).await {
        return Ok((
            StatusCode::OK,
            Json(WatchResponse {
                symbol: symbol.to_string(),
                added: false,
            }),
        ));
    }

    let (listed_a, listed_b) = tokio::join!(
        listed_as(state.venue_a.as_ref(), &symbol),
        listed_as(state.venue_b.as_ref(), &symbol)
    );
    let symbol = match (listed_a, listed_b) {
        (Ok(Some(listed)), _) | (_, Ok(Some(listed))) => listed,
        (Ok(None), Ok(None)) => {
            return Err(AppError::BadRequest(format!(
                "{} is not listed on either venue",
                symbol
            )))
        }
        (Err(e), _) | (_, Err(e)) => {
            warn!("Could not check listing for {}: {}", symbol, e);
            return Err(AppError::Upstream(e.to_string()));
        }
    };

    let added = state.watchlist.add(symbol.clone()).await;
    if added {
        info!("Watching {}", symbol);
    }
    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(WatchResponse {
            symbol: symbol.to_string(),
            added,
        }),
    ))
}
