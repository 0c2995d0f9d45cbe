//! Email and notification endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::error::ApiError;
use super::AppState;

/// Sends an email without propagation; the delegated job logs no request id.
pub async fn send_email_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let handle = state.email.send_email(address)?;
    let result = handle.await?;
    Ok(Json(json!({ "result": result })))
}

/// Sends an email with propagation; the delegated job logs the caller's ids.
pub async fn send_email_propagated_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let handle = state.email.send_email_propagated(address)?;
    let result = handle.await?;
    Ok(Json(json!({ "result": result })))
}

#[derive(Debug, Deserialize)]
pub struct NotificationParams {
    pub user_id: String,
    pub message: String,
}

/// Processes a propagated multi-step notification.
pub async fn notification_handler(
    State(state): State<AppState>,
    Query(params): Query<NotificationParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("notification request - userId: {}", params.user_id);
    let handle = state
        .email
        .process_notification(params.user_id, params.message)?;
    let result = handle.await?;
    Ok(Json(json!({ "result": result })))
}
