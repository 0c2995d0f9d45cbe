//! Networking: configuration, request boundary middleware, handlers,
//! lifecycle, and shutdown control.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod shutdown;

pub use config::NetworkConfig;
pub use handlers::AppState;
pub use module::NetworkModule;
pub use shutdown::{LifecycleState, ShutdownController};
