use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::engine::overlap::OverlapConflict;
use crate::validation::date_range::DateRangeError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidDateRange(String),

    #[error("{0}")]
    RangeTooLarge(String),

    #[error("assignment overlaps an existing {} assignment", .0.subject)]
    AssignmentOverlap(OverlapConflict),

    #[error("{0}")]
    DuplicateRegistration(String),

    #[error("{0}")]
    DuplicateReport(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("no company is associated with this account")]
    Forbidden,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidDateRange(_) => "INVALID_DATE_RANGE",
            AppError::RangeTooLarge(_) => "RANGE_TOO_LARGE",
            AppError::AssignmentOverlap(_) => "ASSIGNMENT_OVERLAP",
            AppError::DuplicateRegistration(_) => "DUPLICATE_REGISTRATION",
            AppError::DuplicateReport(_) => "DUPLICATE_REPORT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidDateRange(_) => StatusCode::BAD_REQUEST,
            AppError::RangeTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::AssignmentOverlap(_)
            | AppError::DuplicateRegistration(_)
            | AppError::DuplicateReport(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::AssignmentOverlap(conflict) => Some(json!({
                "subject": conflict.subject,
                "conflictingAssignment": {
                    "id": conflict.assignment_id,
                    "startDate": conflict.start_date,
                    "endDate": conflict.end_date,
                }
            })),
            _ => None,
        }
    }
}

/// Maps an export range failure onto the export endpoint's statuses: an
/// oversized range is 413, every other failure is 400.
impl From<DateRangeError> for AppError {
    fn from(err: DateRangeError) -> Self {
        match err {
            DateRangeError::TooLong => AppError::RangeTooLarge(err.to_string()),
            _ => AppError::InvalidDateRange(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed with internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "code": self.code(),
            "message": message,
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}
