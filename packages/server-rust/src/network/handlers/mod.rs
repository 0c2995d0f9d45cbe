//! HTTP handler definitions for the `logctx` server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod demo;
pub mod email;
pub mod error;
pub mod health;
pub mod orders;

pub use demo::{error_demo_handler, hello_handler, log_levels_handler};
pub use email::{notification_handler, send_email_handler, send_email_propagated_handler};
pub use error::ApiError;
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use orders::{
    create_order_handler, get_order_async_handler, get_order_async_propagated_handler,
    get_order_handler,
};

use std::sync::Arc;
use std::time::Instant;

use crate::network::config::NetworkConfig;
use crate::network::shutdown::ShutdownController;
use crate::service::{EmailService, OrderService, TaskPool};

/// Shared application state passed to all axum handlers via `State`
/// extraction. Holds `Arc` references so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Order processing service.
    pub orders: Arc<OrderService>,
    /// Email and notification service.
    pub email: Arc<EmailService>,
    /// Worker pool executing delegated work.
    pub pool: Arc<TaskPool>,
    /// Graceful shutdown controller with lifecycle state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Network configuration.
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
