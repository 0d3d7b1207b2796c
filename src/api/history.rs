use crate::api::AppState;
use crate::domain::{Leg, Symbol, TimeMs};
use crate::engine::PeriodStats;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub symbol: String,
    pub as_of_ms: i64,
    pub paired_hours: usize,
    pub seven_day: PeriodStatsDto,
    pub thirty_day: PeriodStatsDto,
}

/// Statistic fields are null when the window had no non-zero spread.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStatsDto {
    pub window_hours: i64,
    pub has_data: bool,
    pub observed_hours: Option<i64>,
    pub success_rate_pct: Option<String>,
    pub better_venue: Option<Leg>,
    pub annualized_rate_pct: Option<String>,
    pub max_spread: Option<String>,
    pub min_spread: Option<String>,
    pub zero_spread_pct: Option<String>,
}

impl From<&PeriodStats> for PeriodStatsDto {
    fn from(stats: &PeriodStats) -> Self {
        let observed = stats.observed();
        Self {
            window_hours: stats.window_hours(),
            has_data: observed.is_some(),
            observed_hours: observed.map(|s| s.observed_hours),
            success_rate_pct: observed.map(|s| s.success_rate_pct.to_canonical_string()),
            better_venue: observed.map(|s| s.better_venue),
            annualized_rate_pct: observed.map(|s| s.annualized_rate_pct.to_canonical_string()),
            max_spread: observed.map(|s| s.max_spread.to_canonical_string()),
            min_spread: observed.map(|s| s.min_spread.to_canonical_string()),
            zero_spread_pct: observed.map(|s| s.zero_spread_pct.to_canonical_string()),
        }
    }
}

pub async fn get_history(
    Query(params): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, AppError> {
    let raw = params.symbol.trim();
    if raw.is_empty() {
        return Err(AppError::BadRequest("symbol is required".into()));
    }
    let symbol = Symbol::canonical(raw);

    let report = state.history.analyze(&symbol, TimeMs::now()).await?;

    Ok(Json(HistoryResponse {
        symbol: report.symbol.to_string(),
        as_of_ms: report.as_of.as_i64(),
        paired_hours: report.paired_hours,
        seven_day: PeriodStatsDto::from(&report.seven_day),
        thirty_day: PeriodStatsDto::from(&report.thirty_day),
    }))
}
