use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContactError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Dependency unavailable: {0}")]
    Dependency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ContactResult<T> = Result<T, ContactError>;

impl ContactError {
    fn label(&self) -> &'static str {
        match self {
            ContactError::Validation(_) => "Validation error",
            ContactError::NotFound(_) => "Not found",
            ContactError::Conflict(_) => "Conflict",
            ContactError::Forbidden(_) => "Forbidden",
            ContactError::Dependency(_) => "Service unavailable",
            ContactError::Internal(_) => "Internal server error",
        }
    }
}

impl ResponseError for ContactError {
    fn status_code(&self) -> StatusCode {
        match self {
            ContactError::Validation(_) => StatusCode::BAD_REQUEST,
            ContactError::NotFound(_) => StatusCode::NOT_FOUND,
            ContactError::Conflict(_) => StatusCode::CONFLICT,
            ContactError::Forbidden(_) => StatusCode::FORBIDDEN,
            ContactError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
            ContactError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ContactError::Internal(detail) => {
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

impl From<validator::ValidationErrors> for ContactError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ContactError::Validation(errors.to_string())
    }
}

impl From<serde_json::Error> for ContactError {
    fn from(err: serde_json::Error) -> Self {
        ContactError::Internal(format!("Serialization failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_codes() {
        assert_eq!(ContactError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(ContactError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ContactError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ContactError::Dependency("db".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[actix_web::test]
    async fn test_conflict_body() {
        let resp = ContactError::Conflict("Version conflict".into()).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["error"], "Conflict");
        assert_eq!(json["message"], "Version conflict");
    }

    #[actix_web::test]
    async fn test_internal_detail_is_hidden() {
        let resp = ContactError::Internal("pool exhausted".into()).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["message"], "Internal server error");
    }
}
