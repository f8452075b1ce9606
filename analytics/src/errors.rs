use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidTimeRange(String),

    #[error("{0}")]
    InsufficientData(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Dependency unavailable: {0}")]
    Dependency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

impl AnalyticsError {
    fn label(&self) -> &'static str {
        match self {
            AnalyticsError::Validation(_) => "Validation error",
            AnalyticsError::InvalidTimeRange(_) => "Invalid time range",
            AnalyticsError::InsufficientData(_) => "Insufficient data",
            AnalyticsError::NotFound(_) => "Not found",
            AnalyticsError::Dependency(_) => "Service unavailable",
            AnalyticsError::Internal(_) => "Internal server error",
        }
    }
}

impl ResponseError for AnalyticsError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalyticsError::Validation(_) | AnalyticsError::InvalidTimeRange(_) => StatusCode::BAD_REQUEST,
            AnalyticsError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalyticsError::NotFound(_) => StatusCode::NOT_FOUND,
            AnalyticsError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
            AnalyticsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AnalyticsError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error while handling request");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.label(),
            "message": message
        }))
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        AnalyticsError::Internal(format!("Serialization failed: {}", err))
    }
}
