use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures reported by a generation backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend is not available")]
    Unavailable,
    #[error("model '{0}' not found")]
    ModelNotFound(String),
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("backend error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request body: {0}")]
    Decode(String),
    #[error("generation backend is not available")]
    BackendUnavailable,
    #[error("model '{0}' not found")]
    ModelNotFound(String),
    #[error(transparent)]
    Backend(BackendError),
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Decode(err.to_string())
    }
}

impl From<BackendError> for ServiceError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable => ServiceError::BackendUnavailable,
            BackendError::ModelNotFound(name) => ServiceError::ModelNotFound(name),
            other => ServiceError::Backend(other),
        }
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Decode(_) => StatusCode::BAD_REQUEST,
            ServiceError::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
