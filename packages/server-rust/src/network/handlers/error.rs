//! Error responses for the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::service::{SubmitError, TaskError};

/// Errors surfaced by API handlers.
///
/// The request boundary does not convert or suppress these; it logs the
/// exit status and clears the context, and the error renders itself as a
/// response here.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The error-demo endpoint's on-purpose failure.
    #[error("deliberate failure for error demonstration")]
    Deliberate,
    /// The worker pool refused the submission.
    #[error(transparent)]
    Submit(#[from] SubmitError),
    /// A delegated unit of work failed.
    #[error("delegated task failed: {0}")]
    Task(#[from] TaskError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Deliberate | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Submit(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!("request failed: {}", self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
