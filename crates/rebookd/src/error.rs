//! Mapping from workflow errors to HTTP responses

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rebook_api::{ErrorBody, ErrorCode, FieldError};
use rebook_core::RescheduleError;
use tracing::{error, warn};

/// Message returned for every failure whose detail stays server-side
const GENERIC_INTERNAL_MESSAGE: &str = "internal server error";

/// Handler error, rendered as an [`ErrorBody`]
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: ErrorCode,
    message: String,
    errors: Vec<FieldError>,
    /// Logged, never sent to the client
    source: Option<anyhow::Error>,
}

impl AppError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            errors: Vec::new(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        let mut err = Self::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::ValidationError,
            "request validation failed",
        );
        err.errors = errors;
        err
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, message)
    }

    /// 500 with a generic message; `source` carries the detail to the log
    pub fn internal(source: anyhow::Error) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError,
            GENERIC_INTERNAL_MESSAGE,
        )
        .with_source(source)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl From<RescheduleError> for AppError {
    fn from(e: RescheduleError) -> Self {
        match e {
            RescheduleError::Validation(errors) => AppError::validation(errors),
            RescheduleError::NotFound(kind) => AppError::not_found(kind.to_string()),
            RescheduleError::Conflict(message) => {
                AppError::new(StatusCode::CONFLICT, ErrorCode::Conflict, message)
            }
            e @ RescheduleError::InvalidArgument(_) => {
                AppError::new(StatusCode::BAD_REQUEST, ErrorCode::InvalidArgument, e.to_string())
            }
            RescheduleError::Consistency { booking_id, detail } => {
                let message = format!("booking {booking_id} needs reconciliation");
                let source = anyhow::anyhow!("{message}: {detail}");
                AppError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::ConsistencyError,
                    message,
                )
                .with_source(source)
            }
            e @ RescheduleError::Internal(_) => AppError::internal(e.into()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "Rejected request body");
        AppError::validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => error!(
                    status = self.status.as_u16(),
                    code = ?self.code,
                    error = %source,
                    "Request failed"
                ),
                None => error!(
                    status = self.status.as_u16(),
                    code = ?self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        }

        let body = ErrorBody {
            code: self.code,
            message: self.message,
            errors: self.errors,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebook_core::NotFoundKind;
    use rebook_util::BookingId;

    #[test]
    fn workflow_errors_map_to_status_codes() {
        let booking = BookingId::generate();
        let cases = [
            (
                RescheduleError::field("currentBookingId", "required"),
                StatusCode::BAD_REQUEST,
                ErrorCode::ValidationError,
            ),
            (
                RescheduleError::InvalidArgument("maybe".into()),
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidArgument,
            ),
            (
                RescheduleError::NotFound(NotFoundKind::Booking(booking.clone())),
                StatusCode::NOT_FOUND,
                ErrorCode::NotFound,
            ),
            (
                RescheduleError::Conflict("pending".into()),
                StatusCode::CONFLICT,
                ErrorCode::Conflict,
            ),
            (
                RescheduleError::Consistency {
                    booking_id: booking,
                    detail: "delete failed".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::ConsistencyError,
            ),
            (
                RescheduleError::Internal("disk I/O error".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
            ),
        ];

        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status(), status);
            assert_eq!(app.code(), code);
        }
    }

    #[test]
    fn consistency_detail_stays_in_the_log() {
        let booking = BookingId::generate();
        let app: AppError = RescheduleError::Consistency {
            booking_id: booking.clone(),
            detail: "request delete failed (disk I/O error)".into(),
        }
        .into();

        assert_eq!(app.code(), ErrorCode::ConsistencyError);
        assert_eq!(app.message, format!("booking {booking} needs reconciliation"));
        assert!(!app.message.contains("disk I/O"));
        assert!(app.source.unwrap().to_string().contains("disk I/O"));
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let app: AppError = RescheduleError::Internal("database is locked".into()).into();
        assert_eq!(app.message, GENERIC_INTERNAL_MESSAGE);
        assert!(app.source.is_some());
    }
}
