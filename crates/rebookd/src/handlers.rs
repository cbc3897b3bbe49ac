//! Request handlers
//!
//! The engine and projector talk to SQLite synchronously, so every call is
//! moved onto the blocking pool.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use rebook_api::{
    AdminRequestView, BookingResponse, DecideRescheduleBody, DecisionResponse, ExpertRequestView,
    HealthResponse, ListResponse, MessageResponse, RescheduleRequest, SubmitRescheduleBody,
};
use rebook_core::{Decision, RescheduleResult};
use tracing::{debug, warn};

use crate::{AppError, AppState};

async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> RescheduleResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(e.into()))?
        .map_err(AppError::from)
}

/// `POST /reschedule`
pub async fn submit_reschedule(
    State(state): State<AppState>,
    body: Result<Json<SubmitRescheduleBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;

    let request = blocking(move || state.engine.submit(&body)).await?;

    debug!(request_id = %request.id, "Submit handled");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Reschedule request submitted successfully")),
    ))
}

/// `GET /reschedule-request`
pub async fn list_requests(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<RescheduleRequest>>, AppError> {
    let list = blocking(move || state.projector.list_requests()).await?;

    Ok(Json(ListResponse::new(
        "Reschedule requests fetched successfully",
        list,
    )))
}

/// `GET /reschedule-requests/:expertId`
pub async fn list_expert_requests(
    State(state): State<AppState>,
    Path(expert_id): Path<String>,
) -> Result<Json<ListResponse<ExpertRequestView>>, AppError> {
    let list = blocking(move || state.projector.list_for_expert(&expert_id)).await?;

    Ok(Json(ListResponse::new(
        "Reschedule requests for expert fetched successfully",
        list,
    )))
}

/// `GET /reschedule-requests`
pub async fn list_admin_requests(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<AdminRequestView>>, AppError> {
    let list = blocking(move || state.projector.list_for_admin()).await?;

    Ok(Json(ListResponse::new(
        "All reschedule requests fetched successfully",
        list,
    )))
}

/// `POST /handle-Reschedule`
pub async fn decide_reschedule(
    State(state): State<AppState>,
    body: Result<Json<DecideRescheduleBody>, JsonRejection>,
) -> Result<Json<DecisionResponse>, AppError> {
    let Json(body) = body?;

    let decision = blocking(move || state.engine.decide(&body)).await?;

    let response = match decision {
        Decision::Accepted { booking, .. } => DecisionResponse {
            message: "Reschedule request accepted".into(),
            booking: Some(booking),
        },
        Decision::Rejected { .. } => DecisionResponse {
            message: "Reschedule request rejected".into(),
            booking: None,
        },
    };
    Ok(Json(response))
}

/// `GET /bookings/:bookingId`
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = blocking(move || state.projector.find_booking(&booking_id)).await?;

    Ok(Json(BookingResponse {
        message: "Booking fetched successfully".into(),
        booking,
    }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.store.clone();
    let healthy = tokio::task::spawn_blocking(move || store.is_healthy())
        .await
        .unwrap_or(false);

    if healthy {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".into(),
            }),
        )
    } else {
        warn!("Health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable".into(),
            }),
        )
    }
}
