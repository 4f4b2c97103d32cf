use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::ScheduledSlot;
use crate::services::scheduling::ScheduleError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("end time must be after start time")]
    InvalidInterval,

    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("detailer busy at this time")]
    SchedulingConflict { blocking: Vec<ScheduledSlot> },
}

impl From<ScheduleError> for AppError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::InvalidInterval => AppError::InvalidInterval,
            ScheduleError::BookingNotFound(id) => AppError::NotFound(format!("booking {id}")),
            ScheduleError::DetailerNotFound(id) => AppError::NotFound(format!("detailer {id}")),
            ScheduleError::InvalidTransition { id, status } => AppError::InvalidTransition(
                format!("booking {id} is {}", status.as_str()),
            ),
            ScheduleError::ConcurrentUpdate(id) => AppError::InvalidTransition(format!(
                "booking {id} was modified concurrently, retry the assignment"
            )),
            ScheduleError::Conflict { blocking } => AppError::SchedulingConflict { blocking },
            ScheduleError::Storage(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) | AppError::InvalidInterval | AppError::InvalidTransition(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::SchedulingConflict { .. } => StatusCode::CONFLICT,
        };

        if let AppError::Database(e) = &self {
            tracing::error!(error = %e, "request failed on storage");
        }

        let body = match &self {
            AppError::SchedulingConflict { blocking } => serde_json::json!({
                "status": "conflict",
                "error": self.to_string(),
                "blocking_intervals": blocking,
            }),
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}
