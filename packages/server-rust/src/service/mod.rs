//! Domain services and the worker pool executing delegated work.
//!
//! 1. **Worker pool** (`pool`): bounded queue, fixed workers, reject on
//!    saturation; each worker keeps a persistent context cell.
//! 2. **Orders** (`orders`): synchronous, delegated, and scoped-context
//!    order processing.
//! 3. **Email** (`email`): delegated sending and notifications.

pub mod email;
pub mod orders;
pub mod pool;

pub use email::EmailService;
pub use orders::{DelegatedOutcome, OrderService};
pub use pool::{PoolConfig, SubmitError, TaskError, TaskHandle, TaskPool};
