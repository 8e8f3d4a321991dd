//! HTTP error responses.
//!
//! Every error body has the mint endpoint's shape:
//! `{"success": false, "error": "..."}`.

use crate::domain::config::ConfigError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Client sent an unusable request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Request handling failed unexpectedly (500)
    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
