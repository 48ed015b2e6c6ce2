use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::store::StoreError;

/// Failures a review operation reports to its caller. Notification problems
/// are never represented here; see `notifier::NotificationError`.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Feedback for this file has already been submitted")]
    DuplicateFeedback,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("You have not accepted a review assignment for this course")]
    NotAccepted,

    #[error("Missing or invalid session")]
    Unauthorized,
}

impl ReviewError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReviewError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ReviewError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ReviewError::DuplicateFeedback => StatusCode::CONFLICT,
            ReviewError::NotFound(_) => StatusCode::NOT_FOUND,
            ReviewError::NotAccepted => StatusCode::FORBIDDEN,
            ReviewError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = match &self {
            ReviewError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
