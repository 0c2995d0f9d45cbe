//! Order processing: the context-inheritance and hand-off showcase.
//!
//! Synchronous processing runs in the caller's execution context and reads
//! the store directly. Delegated processing goes through the worker pool,
//! either bare (the job sees whatever the worker's cell holds, normally
//! nothing) or wrapped (the job sees the caller's snapshot).

use std::sync::Arc;

use tracing::{debug, info};

use logctx_core::mdc::{self, keys};
use logctx_core::{scoped, wrap};

use super::pool::{SubmitError, TaskHandle, TaskPool};

/// Outcome of a delegated order job, carrying the request id the job
/// actually observed while running.
#[derive(Debug, Clone)]
pub struct DelegatedOutcome {
    pub result: String,
    pub observed_request_id: Option<String>,
}

/// Order operations.
#[derive(Debug)]
pub struct OrderService {
    pool: Arc<TaskPool>,
}

impl OrderService {
    #[must_use]
    pub fn new(pool: Arc<TaskPool>) -> Self {
        Self { pool }
    }

    /// Processes an order in the caller's execution context; every step's
    /// log line carries the request context without any copying.
    pub fn process_order(&self, order_id: &str) -> String {
        info!("processing order - orderId: {}", order_id);
        Self::validate_order(order_id);
        Self::calculate_price(order_id);
        Self::save_order(order_id);
        info!("order processed - orderId: {}", order_id);
        format!("Order processed: {order_id}")
    }

    fn validate_order(order_id: &str) {
        debug!("validating order - orderId: {}", order_id);
    }

    fn calculate_price(order_id: &str) {
        debug!("calculating price - orderId: {}", order_id);
    }

    fn save_order(order_id: &str) {
        debug!("saving order - orderId: {}", order_id);
    }

    /// Delegates processing to the pool WITHOUT propagation. The job's log
    /// lines carry no request id; the outcome records what it observed.
    ///
    /// # Errors
    ///
    /// Propagates pool saturation or shutdown as [`SubmitError`].
    pub fn process_order_async(
        &self,
        order_id: String,
    ) -> Result<TaskHandle<DelegatedOutcome>, SubmitError> {
        info!("delegating order without propagation - orderId: {}", order_id);
        self.pool.submit(async move {
            let observed = mdc::get(keys::REQUEST_ID);
            info!(
                "async order processing - orderId: {} requestId: {:?}",
                order_id, observed
            );
            DelegatedOutcome {
                result: format!("Async order processed: {order_id}"),
                observed_request_id: observed,
            }
        })
    }

    /// Delegates processing WITH propagation: the job runs under the
    /// caller's snapshot and its store is cleared afterward.
    ///
    /// # Errors
    ///
    /// Propagates pool saturation or shutdown as [`SubmitError`].
    pub fn process_order_async_propagated(
        &self,
        order_id: String,
    ) -> Result<TaskHandle<DelegatedOutcome>, SubmitError> {
        info!("delegating order with propagation - orderId: {}", order_id);
        self.pool.submit(wrap(async move {
            let observed = mdc::get(keys::REQUEST_ID);
            info!(
                "async order processing - orderId: {} requestId: {:?}",
                order_id, observed
            );
            DelegatedOutcome {
                result: format!("Async order with context processed: {order_id}"),
                observed_request_id: observed,
            }
        }))
    }

    /// Processes an order under temporary `orderId`/`category` keys; only
    /// those keys are removed afterward, the request-level keys survive.
    pub async fn process_order_scoped(&self, order_id: &str, category: &str) -> String {
        let extra = [
            ("orderId".to_owned(), order_id.to_owned()),
            ("category".to_owned(), category.to_owned()),
        ];
        scoped::with_keys(extra, async move {
            info!("processing order with extra context - category: {}", category);
            format!("Order processed with extra context: {order_id}")
        })
        .await
    }
}
