//! Demonstration endpoints for same-context reads and failure cleanup.

use axum::Json;
use tracing::{debug, error, info, trace, warn};

use logctx_core::mdc::{self, keys};

use super::error::ApiError;

/// Returns the identifiers currently visible in the context store.
///
/// Runs in the same execution context as the request boundary, so the
/// values are inherited without any explicit propagation.
pub async fn hello_handler() -> Json<serde_json::Value> {
    info!("handling hello request");
    Json(serde_json::json!({
        "message": "hello from logctx",
        "requestId": mdc::get(keys::REQUEST_ID),
        "userId": mdc::get(keys::USER_ID),
        "context": mdc::capture(),
    }))
}

/// Emits one line per log level; each carries the request context.
pub async fn log_levels_handler() -> &'static str {
    trace!("trace level line");
    debug!("debug level line");
    info!("info level line");
    warn!("warn level line");
    error!("error level line");
    "emitted one line per level\n"
}

/// Always fails. Exercises context cleanup and header echo on the failure
/// path; the emitted error line still carries the request id.
pub async fn error_demo_handler() -> Result<(), ApiError> {
    info!("about to fail on purpose");
    Err(ApiError::Deliberate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hello_reports_store_contents() {
        let Json(body) = mdc::scope(async {
            mdc::put(keys::REQUEST_ID, "r-7");
            mdc::put(keys::USER_ID, "u-7");
            hello_handler().await
        })
        .await;

        assert_eq!(body["requestId"], "r-7");
        assert_eq!(body["userId"], "u-7");
        assert_eq!(body["context"]["requestId"], "r-7");
    }

    #[tokio::test]
    async fn hello_outside_scope_reports_null_ids() {
        let Json(body) = hello_handler().await;
        assert!(body["requestId"].is_null());
        assert!(body["context"].is_null());
    }

    #[tokio::test]
    async fn error_demo_always_fails() {
        let result = error_demo_handler().await;
        assert!(matches!(result, Err(ApiError::Deliberate)));
    }
}
