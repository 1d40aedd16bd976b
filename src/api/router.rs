use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;
use super::auth::require_auth;
use super::handlers;
use super::rate_limit::enforce_rate_limit;

pub fn create_router(state: AppState) -> Router {
    // Public routes: no auth
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    // Protected API routes: Bearer token when API_TOKEN is set
    let protected = Router::new()
        // Positions
        .route("/api/positions", get(handlers::positions::list).post(handlers::positions::create))
        .route("/api/positions/:position_id", get(handlers::positions::detail))
        // Liquidation
        .route("/api/liquidation/simulate/:position_id", get(handlers::liquidation::simulate))
        .route("/api/liquidation/execute", post(handlers::liquidation::execute))
        // Analytics
        .route("/api/analytics/snapshot/:position_id", post(handlers::analytics::snapshot))
        .route("/api/analytics/snapshots", get(handlers::analytics::snapshots))
        // Batch
        .route("/api/batch/positions", post(handlers::batch::create_positions))
        .route("/api/batch/simulate", post(handlers::batch::simulate))
        .route("/api/batch/execute", post(handlers::batch::execute))
        // Risk metrics
        .route("/api/metrics/system", get(handlers::risk_metrics::system))
        .route("/api/metrics/positions", get(handlers::risk_metrics::positions))
        // Block monitor & events
        .route("/api/monitor/start", post(handlers::monitor::start))
        .route("/api/monitor/stop", post(handlers::monitor::stop))
        .route("/api/monitor/status", get(handlers::monitor::status))
        .route("/api/events", get(handlers::events::list))
        .route("/api/events/index", post(handlers::events::index_range))
        // WebSocket
        .route("/ws", get(handlers::ws::handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), enforce_rate_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
