//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing,
//! request ids), and creates the axum router ready for serving.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Kiosks and the dashboard are served from other origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let vehicle = Router::new()
        .route("/entry", post(handlers::vehicle_entry))
        .route("/exit", post(handlers::vehicle_exit))
        .route("/inside", get(handlers::vehicles_inside))
        .route("/history/today", get(handlers::history_today))
        .route("/statistics/hourly", get(handlers::hourly_statistics))
        .route("/statistics/summary", get(handlers::statistics_summary))
        .route("/{license_plate}", get(handlers::get_vehicle))
        .route("/{license_plate}/history", get(handlers::vehicle_history));

    let parking_logs = Router::new()
        .route("/", get(handlers::list_logs).post(handlers::create_log))
        .route("/today", get(handlers::today_logs))
        .route("/statistics/camera", get(handlers::camera_statistics))
        .route("/entry/{license_plate}/latest", get(handlers::latest_entry_log))
        .route("/exit/{license_plate}/latest", get(handlers::latest_exit_log))
        .route(
            "/{id}",
            get(handlers::get_log)
                .put(handlers::update_log)
                .delete(handlers::delete_log),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/vehicle", vehicle)
        .nest("/parking-logs", parking_logs)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::FullRepository;
    use chrono::FixedOffset;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let repo = Arc::new(LocalRepository::new()) as Arc<dyn FullRepository>;
        let state = AppState::with_system_clock(repo, FixedOffset::east_opt(0).unwrap());
        let _router = create_router(state);
    }
}
