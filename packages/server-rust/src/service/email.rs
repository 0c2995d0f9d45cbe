//! Email and notification delegation, with and without propagation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use logctx_core::mdc::{self, keys};
use logctx_core::wrap;

use super::pool::{SubmitError, TaskHandle, TaskPool};

/// Email sending delegated to the worker pool.
#[derive(Debug)]
pub struct EmailService {
    pool: Arc<TaskPool>,
}

impl EmailService {
    #[must_use]
    pub fn new(pool: Arc<TaskPool>) -> Self {
        Self { pool }
    }

    /// Sends without propagation; the job's log lines carry no request id.
    ///
    /// # Errors
    ///
    /// Propagates pool saturation or shutdown as [`SubmitError`].
    pub fn send_email(&self, address: String) -> Result<TaskHandle<String>, SubmitError> {
        info!("email send requested - to: {}", address);
        self.pool.submit(async move {
            info!(
                "sending email - to: {} requestId: {:?}",
                address,
                mdc::get(keys::REQUEST_ID)
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
            info!("email sent - to: {}", address);
            format!("Email sent: {address}")
        })
    }

    /// Sends with propagation; the job's log lines carry the caller's ids.
    ///
    /// # Errors
    ///
    /// Propagates pool saturation or shutdown as [`SubmitError`].
    pub fn send_email_propagated(&self, address: String) -> Result<TaskHandle<String>, SubmitError> {
        info!("email send requested - to: {}", address);
        self.pool.submit(wrap(async move {
            info!(
                "sending email - to: {} requestId: {:?}",
                address,
                mdc::get(keys::REQUEST_ID)
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
            info!("email sent - to: {}", address);
            format!("Email sent with context: {address}")
        }))
    }

    /// Multi-step propagated notification; every step logs under the
    /// caller's context.
    ///
    /// # Errors
    ///
    /// Propagates pool saturation or shutdown as [`SubmitError`].
    pub fn process_notification(
        &self,
        user_id: String,
        message: String,
    ) -> Result<TaskHandle<String>, SubmitError> {
        info!("notification requested - userId: {}", user_id);
        self.pool.submit(wrap(async move {
            info!(
                "processing notification - userId: {} message: {}",
                user_id, message
            );
            Self::store_notification(&user_id, &message);
            Self::push_notification(&user_id, &message);
            info!("notification processed - userId: {}", user_id);
            format!("Notification processed for: {user_id}")
        }))
    }

    fn store_notification(user_id: &str, _message: &str) {
        debug!("storing notification - userId: {}", user_id);
    }

    fn push_notification(user_id: &str, _message: &str) {
        debug!("pushing notification - userId: {}", user_id);
    }
}
