//! Mapping of pipeline errors onto HTTP responses.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ibn_core::IbnError;
use serde_json::json;
use tracing::error;

/// Handler error; the body is `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(pub IbnError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            IbnError::NotFound { .. } => StatusCode::NOT_FOUND,
            IbnError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IbnError::Conflict { .. } => StatusCode::CONFLICT,
            IbnError::ControllerApi { .. }
            | IbnError::DeviceOperation { .. }
            | IbnError::Translation(_)
            | IbnError::Http(_) => StatusCode::BAD_GATEWAY,
            IbnError::Configuration(_) | IbnError::Io(_) | IbnError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<IbnError> for ApiError {
    fn from(err: IbnError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
