// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.
//!
//! Validation errors carry enough context (measured distance, required
//! radius, accuracy value) for the caller to render actionable feedback.
//! None of them are retried automatically; they are real precondition
//! failures, not transient faults.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Wrong visit/session status for the requested transition.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Proof may only be added while a visit is in progress.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("GPS accuracy is too low ({accuracy_m:.0}m, maximum {max_m:.0}m). Please move to an open area and retry.")]
    AccuracyTooLow { accuracy_m: f64, max_m: f64 },

    #[error("You are {distance_m:.0}m away from the target location. Must be within {radius_m:.0}m to check in.")]
    OutsideGeofence { distance_m: f64, radius_m: f64 },

    #[error("Must have at least 1 photo and 1 note before checking out")]
    ProofIncomplete,

    #[error("You already have an open duty session")]
    SessionAlreadyOpen,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// Stable machine-readable code for the error kind.
    fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidToken => "invalid_token",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::InvalidState(_) => "invalid_state",
            AppError::AccuracyTooLow { .. } => "accuracy_too_low",
            AppError::OutsideGeofence { .. } => "outside_geofence",
            AppError::ProofIncomplete => "proof_incomplete",
            AppError::SessionAlreadyOpen => "session_already_open",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::InvalidTransition(_)
            | AppError::InvalidState(_)
            | AppError::AccuracyTooLow { .. }
            | AppError::OutsideGeofence { .. }
            | AppError::ProofIncomplete
            | AppError::SessionAlreadyOpen => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            // Server-side failures log the cause and return an opaque body.
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                None
            }
            AppError::Unauthorized | AppError::InvalidToken => None,
            other => Some(other.to_string()),
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geofence_error_carries_distance() {
        let err = AppError::OutsideGeofence {
            distance_m: 412.4,
            radius_m: 150.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("412m"), "{}", msg);
        assert!(msg.contains("150m"), "{}", msg);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Forbidden("nope".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::SessionAlreadyOpen.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
