use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hie_core::LabError;

/// Error returned by the HTTP handlers of the labs.
///
/// Client mistakes are answered with their message; internal failures are logged and
/// answered with a generic body.
#[derive(Debug, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::BadRequest(message) | ApiError::NotFound(message) => {
                (status, message).into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (status, "Internal error").into_response()
            }
        }
    }
}

impl From<LabError> for ApiError {
    fn from(e: LabError) -> Self {
        match e {
            LabError::InvalidInput(message) => ApiError::BadRequest(message),
            LabError::NotFound(message) => ApiError::NotFound(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
