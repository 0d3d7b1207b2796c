use crate::api::AppState;
use crate::engine::{FundingRow, HedgeEstimate, RateOutcome, Receiver};
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingResponse {
    pub generated_at_ms: i64,
    pub rows: Vec<FundingRowDto>,
}

/// Rates are percent per hour. An invalid value is null with a reason.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRowDto {
    pub symbol: String,
    pub rate_a_per_hour: Option<String>,
    pub rate_a_invalid: Option<String>,
    pub rate_b_per_hour: Option<String>,
    pub rate_b_invalid: Option<String>,
    pub next_settlement_a_ms: Option<i64>,
    pub next_settlement_b_ms: Option<i64>,
    pub estimate: Option<EstimateDto>,
    pub estimate_invalid: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateDto {
    pub notional_a: String,
    pub notional_b: String,
    pub hedged_notional: String,
    pub net_rate_per_hour: String,
    pub receiver: Receiver,
    pub est_pnl_per_hour: String,
    pub est_return_pct_per_hour: String,
}

impl From<&HedgeEstimate> for EstimateDto {
    fn from(est: &HedgeEstimate) -> Self {
        Self {
            notional_a: est.notional_a.to_canonical_string(),
            notional_b: est.notional_b.to_canonical_string(),
            hedged_notional: est.hedged_notional.to_canonical_string(),
            net_rate_per_hour: est.net_rate_per_hour.to_canonical_string(),
            receiver: est.receiver,
            est_pnl_per_hour: est.est_pnl_per_hour.to_canonical_string(),
            est_return_pct_per_hour: est.est_return_pct_per_hour.to_canonical_string(),
        }
    }
}

fn split_rate(rate: &RateOutcome) -> (Option<String>, Option<String>) {
    match rate {
        Ok(rate) => (Some(rate.per_hour().to_canonical_string()), None),
        Err(reason) => (None, Some(reason.to_string())),
    }
}

impl From<&FundingRow> for FundingRowDto {
    fn from(row: &FundingRow) -> Self {
        let (rate_a_per_hour, rate_a_invalid) = split_rate(&row.rate_a);
        let (rate_b_per_hour, rate_b_invalid) = split_rate(&row.rate_b);
        let (estimate, estimate_invalid) = match &row.estimate {
            Ok(est) => (Some(EstimateDto::from(est)), None),
            Err(reason) => (None, Some(reason.to_string())),
        };
        Self {
            symbol: row.symbol.to_string(),
            rate_a_per_hour,
            rate_a_invalid,
            rate_b_per_hour,
            rate_b_invalid,
            next_settlement_a_ms: row.next_settlement_a.map(|t| t.as_i64()),
            next_settlement_b_ms: row.next_settlement_b.map(|t| t.as_i64()),
            estimate,
            estimate_invalid,
        }
    }
}

pub async fn get_funding(State(state): State<AppState>) -> Result<Json<FundingResponse>, AppError> {
    let view = state.current_view()?;
    Ok(Json(FundingResponse {
        generated_at_ms: view.generated_at.as_i64(),
        rows: view.funding.iter().map(FundingRowDto::from).collect(),
    }))
}
