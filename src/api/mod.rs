pub mod funding;
pub mod health;
pub mod history;
pub mod positions;
pub mod watch;

use crate::datasource::VenueSource;
use crate::engine::CrossVenueView;
use crate::error::AppError;
use crate::orchestration::{HistoryAnalyzer, ViewReceiver, WatchList};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub view: ViewReceiver,
    pub watchlist: WatchList,
    pub venue_a: Arc<dyn VenueSource>,
    pub venue_b: Arc<dyn VenueSource>,
    pub history: Arc<HistoryAnalyzer>,
}

impl AppState {
    pub fn new(
        view: ViewReceiver,
        watchlist: WatchList,
        venue_a: Arc<dyn VenueSource>,
        venue_b: Arc<dyn VenueSource>,
        history: Arc<HistoryAnalyzer>,
    ) -> Self {
        Self {
            view,
            watchlist,
            venue_a,
            venue_b,
            history,
        }
    }

    /// Latest published view, or NotReady before the first cycle.
    pub fn current_view(&self) -> Result<Arc<CrossVenueView>, AppError> {
        self.view
            .borrow()
            .clone()
            .ok_or_else(|| AppError::NotReady("warming_up".to_string()))
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/positions", get(positions::get_positions))
        .route("/v1/funding", get(funding::get_funding))
        .route("/v1/history", get(history::get_history))
        .route("/v1/watch", get(watch::get_watch).post(watch::add_watch))
        .layer(cors)
        .with_state(state)
}
