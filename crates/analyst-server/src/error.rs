//! HTTP error mapping

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// A failed pipeline run, reported as `500 {"detail": ...}`
#[derive(Debug)]
pub struct AppError(analyst_core::Error);

impl From<analyst_core::Error> for AppError {
    fn from(err: analyst_core::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Pipeline failed: {}", self.0);
        let body = json!({ "detail": format!("Analysis pipeline failed: {}", self.0) });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
