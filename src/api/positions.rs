use crate::api::AppState;
use crate::engine::{LegStatus, LegView, VenueStatus};
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResponse {
    pub generated_at_ms: i64,
    pub venue_a: VenueStatusDto,
    pub venue_b: VenueStatusDto,
    pub rows: Vec<PositionRowDto>,
    pub total_net_pnl: String,
    /// Null unless both venues reported an account value.
    pub total_account_value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueStatusDto {
    pub venue: String,
    pub available: bool,
    pub error: Option<String>,
    pub account_value: Option<String>,
}

impl From<&VenueStatus> for VenueStatusDto {
    fn from(status: &VenueStatus) -> Self {
        Self {
            venue: status.venue.to_string(),
            available: status.error.is_none(),
            error: status.error.clone(),
            account_value: status.account_value.map(|d| d.to_canonical_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRowDto {
    pub symbol: String,
    pub venue_a: LegDto,
    pub venue_b: LegDto,
    pub total_net_pnl: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegDto {
    pub status: &'static str,
    pub side: &'static str,
    pub size: String,
    pub entry_price: String,
    pub entry_price_is_estimated: bool,
    pub mark_price: Option<String>,
    /// Null when the leg is unavailable or has no mark.
    pub notional: Option<String>,
    pub net_pnl: String,
}

impl From<&LegView> for LegDto {
    fn from(leg: &LegView) -> Self {
        let status = match leg.status {
            LegStatus::Open => "open",
            LegStatus::Absent => "absent",
            LegStatus::Unavailable => "unavailable",
        };
        Self {
            status,
            side: leg.side.label(),
            size: leg.size.to_canonical_string(),
            entry_price: leg.entry_price.to_canonical_string(),
            entry_price_is_estimated: leg.entry_price_is_estimated,
            mark_price: leg.mark_price.map(|d| d.to_canonical_string()),
            notional: leg.notional().map(|d| d.to_canonical_string()),
            net_pnl: leg.net_pnl.to_canonical_string(),
        }
    }
}

pub async fn get_positions(
    State(state): State<AppState>,
) -> Result<Json<PositionsResponse>, AppError> {
    let view = state.current_view()?;

    let rows = view
        .rows
        .iter()
        .map(|row| PositionRowDto {
            symbol: row.symbol.to_string(),
            venue_a: LegDto::from(&row.venue_a),
            venue_b: LegDto::from(&row.venue_b),
            total_net_pnl: row.total_net_pnl.to_canonical_string(),
        })
        .collect();

    Ok(Json(PositionsResponse {
        generated_at_ms: view.generated_at.as_i64(),
        venue_a: VenueStatusDto::from(&view.venue_a),
        venue_b: VenueStatusDto::from(&view.venue_b),
        rows,
        total_net_pnl: view.total_net_pnl.to_canonical_string(),
        total_account_value: view.total_account_value.map(|d| d.to_canonical_string()),
    }))
}
