//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` creates resources,
//! `start()` binds the TCP listener, and `serve()` starts accepting
//! connections. The worker pool and shutdown controller are allocated in
//! `new()` so other code can hold references before the server runs.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    create_order_handler, error_demo_handler, get_order_async_handler,
    get_order_async_propagated_handler, get_order_handler, health_handler, hello_handler,
    liveness_handler, log_levels_handler, notification_handler, readiness_handler,
    send_email_handler, send_email_propagated_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::service::{EmailService, OrderService, PoolConfig, TaskPool};

/// Manages the full HTTP server lifecycle.
///
/// 1. `new()` -- allocates shared state (worker pool, shutdown controller)
/// 2. `start()` -- binds the TCP listener to the configured address
/// 3. `serve()` -- accepts connections until the shutdown future resolves,
///    then drains in-flight requests and shuts the pool down
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    pool: Arc<TaskPool>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    ///
    /// Must be called inside a Tokio runtime (the pool spawns its workers).
    #[must_use]
    pub fn new(config: NetworkConfig, pool_config: PoolConfig) -> Self {
        Self {
            config,
            listener: None,
            pool: Arc::new(TaskPool::new(pool_config)),
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Shared reference to the worker pool.
    #[must_use]
    pub fn pool(&self) -> Arc<TaskPool> {
        Arc::clone(&self.pool)
    }

    /// Shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health`, `/health/live`, `/health/ready` -- health surface
    /// - `GET /api/hello` -- context visibility in the same execution context
    /// - `GET /api/log-levels` -- one line per level, all carrying context
    /// - `GET /api/error-demo` -- failure path with guaranteed cleanup
    /// - `GET /api/orders/{order_id}[/async|/async-propagated]` -- order
    ///   processing without/with hand-off, without/with propagation
    /// - `POST /api/orders?category=C` -- scoped extra context keys
    /// - `GET /api/email/{address}/plain|propagated` -- delegated sending
    /// - `POST /api/notification` -- propagated multi-step job
    #[must_use]
    pub fn build_router(&self) -> Router {
        let pool = Arc::clone(&self.pool);
        let state = AppState {
            orders: Arc::new(OrderService::new(Arc::clone(&pool))),
            email: Arc::new(EmailService::new(Arc::clone(&pool))),
            pool,
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        };

        let layers = build_http_layers(&self.config, Arc::clone(&self.shutdown));

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route("/api/hello", get(hello_handler))
            .route("/api/log-levels", get(log_levels_handler))
            .route("/api/error-demo", get(error_demo_handler))
            .route("/api/orders", post(create_order_handler))
            .route("/api/orders/{order_id}", get(get_order_handler))
            .route("/api/orders/{order_id}/async", get(get_order_async_handler))
            .route(
                "/api/orders/{order_id}/async-propagated",
                get(get_order_async_propagated_handler),
            )
            .route("/api/email/{address}/plain", get(send_email_handler))
            .route(
                "/api/email/{address}/propagated",
                get(send_email_propagated_handler),
            )
            .route("/api/notification", post(notification_handler))
            .layer(layers)
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until the shutdown future resolves, then drains.
    ///
    /// After the shutdown signal:
    /// 1. lifecycle transitions to Draining
    /// 2. waits up to 30 seconds for in-flight requests to complete
    /// 3. the worker pool stops accepting, drains its queue, and is joined
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .take()
            .expect("start() must be called before serve()");
        let pool = Arc::clone(&self.pool);
        let shutdown_ctrl = Arc::clone(&self.shutdown);

        shutdown_ctrl.set_ready();
        info!("Serving HTTP connections");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        shutdown_ctrl.trigger_shutdown();
        let drained = shutdown_ctrl.wait_for_drain(Duration::from_secs(30)).await;
        if !drained {
            warn!("timed out waiting for in-flight requests to drain");
        }

        pool.shutdown().await;
        info!("Server stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
