//! Health, liveness, and readiness endpoint handlers.
//!
//! These handlers expose server health information for orchestrators and
//! operational monitoring.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::shutdown::LifecycleState;

/// Returns detailed health information as JSON.
///
/// Always returns 200 -- the `state` field in the response body indicates
/// whether the server is actually healthy, so monitoring tools can tell
/// "up but draining" from "down".
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "state": state.shutdown.state().as_str(),
        "in_flight": state.shutdown.in_flight_count(),
        "pool_workers": state.pool.worker_count(),
        "pool_queued": state.pool.queued(),
        "pool_queue_capacity": state.pool.queue_capacity(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Liveness probe -- always returns 200 OK.
///
/// Only checks that the process is running and responsive; a failed
/// liveness probe typically triggers a restart, so it must not depend on
/// lifecycle state.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe -- 200 when ready, 503 otherwise.
///
/// Returns 503 during startup, while draining, and after stop, removing
/// the instance from load-balancer rotation.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.state() == LifecycleState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;
    use crate::network::config::NetworkConfig;
    use crate::network::shutdown::ShutdownController;
    use crate::service::{EmailService, OrderService, PoolConfig, TaskPool};

    fn test_state() -> AppState {
        let pool = Arc::new(TaskPool::new(PoolConfig {
            workers: 1,
            queue_capacity: 4,
        }));
        AppState {
            orders: Arc::new(OrderService::new(Arc::clone(&pool))),
            email: Arc::new(EmailService::new(Arc::clone(&pool))),
            pool,
            shutdown: Arc::new(ShutdownController::new()),
            config: Arc::new(NetworkConfig::default()),
            start_time: Instant::now(),
        }
    }

    #[tokio::test]
    async fn health_reports_all_fields() {
        let state = test_state();
        state.shutdown.set_ready();

        let Json(body) = health_handler(State(state)).await;
        assert_eq!(body["state"], "ready");
        assert_eq!(body["in_flight"], 0);
        assert_eq!(body["pool_workers"], 1);
        assert_eq!(body["pool_queued"], 0);
        assert_eq!(body["pool_queue_capacity"], 4);
        assert!(body["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn health_reports_starting_then_draining() {
        let state = test_state();
        let Json(body) = health_handler(State(state.clone())).await;
        assert_eq!(body["state"], "starting");

        state.shutdown.set_ready();
        state.shutdown.trigger_shutdown();
        let Json(body) = health_handler(State(state)).await;
        assert_eq!(body["state"], "draining");
    }

    #[tokio::test]
    async fn health_reports_in_flight_requests() {
        let state = test_state();
        let _guard = state.shutdown.in_flight_guard();

        let Json(body) = health_handler(State(state)).await;
        assert_eq!(body["in_flight"], 1);
    }

    #[tokio::test]
    async fn liveness_always_ok() {
        assert_eq!(liveness_handler().await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_follows_lifecycle() {
        let state = test_state();
        assert_eq!(
            readiness_handler(State(state.clone())).await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.shutdown.set_ready();
        assert_eq!(readiness_handler(State(state.clone())).await, StatusCode::OK);

        state.shutdown.trigger_shutdown();
        assert_eq!(
            readiness_handler(State(state)).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
