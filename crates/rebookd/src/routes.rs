//! Route table

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{AppState, handlers};

/// Build the service router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/reschedule", post(handlers::submit_reschedule))
        .route("/reschedule-request", get(handlers::list_requests))
        .route("/reschedule-requests", get(handlers::list_admin_requests))
        .route(
            "/reschedule-requests/:expertId",
            get(handlers::list_expert_requests),
        )
        .route("/handle-Reschedule", post(handlers::decide_reschedule))
        .route("/bookings/:bookingId", get(handlers::get_booking))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
