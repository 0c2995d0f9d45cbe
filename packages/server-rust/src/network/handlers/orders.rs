//! Order endpoints: synchronous, delegated, and scoped-context variants.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::error::ApiError;
use super::AppState;

/// Synchronous order processing. The whole chain (boundary -> handler ->
/// service) runs in one execution context, so the store is read directly.
pub async fn get_order_handler(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Json<serde_json::Value> {
    info!("order request - orderId: {}", order_id);
    let result = state.orders.process_order(&order_id);
    Json(json!({ "result": result }))
}

/// Delegates to the worker pool WITHOUT propagation; the response reports
/// the request id the job observed (none).
pub async fn get_order_async_handler(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let handle = state.orders.process_order_async(order_id)?;
    let outcome = handle.await?;
    Ok(Json(json!({
        "result": outcome.result,
        "observedRequestId": outcome.observed_request_id,
    })))
}

/// Delegates WITH propagation; the job observes the caller's request id.
pub async fn get_order_async_propagated_handler(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let handle = state.orders.process_order_async_propagated(order_id)?;
    let outcome = handle.await?;
    Ok(Json(json!({
        "result": outcome.result,
        "observedRequestId": outcome.observed_request_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderParams {
    pub category: String,
}

/// Creates an order and processes it under scoped `orderId`/`category`
/// keys; the keys are gone again once the response is produced.
pub async fn create_order_handler(
    State(state): State<AppState>,
    Query(params): Query<CreateOrderParams>,
) -> Json<serde_json::Value> {
    info!("order creation request - category: {}", params.category);
    let order_id = next_order_id();
    let result = state
        .orders
        .process_order_scoped(&order_id, &params.category)
        .await;
    Json(json!({ "result": result, "orderId": order_id }))
}

fn next_order_id() -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis());
    format!("ORD-{millis}")
}
