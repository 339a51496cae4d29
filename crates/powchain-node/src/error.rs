use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use powchain_core::{ChainError, PowError};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing values")]
    MissingFields,

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error(transparent)]
    SearchAborted(#[from] PowError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields | ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::SearchAborted(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Chain(ChainError::StaleTemplate { .. }) => StatusCode::CONFLICT,
            ApiError::Chain(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, error = %self, "request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
