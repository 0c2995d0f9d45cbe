//! Graceful shutdown with in-flight request tracking.
//!
//! Uses `ArcSwap` for lock-free lifecycle transitions and an atomic counter
//! with RAII guards for in-flight accounting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

/// Server lifecycle state.
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Initializing, not yet accepting requests.
    Starting,
    /// Fully operational.
    Ready,
    /// Draining in-flight requests; no new requests accepted.
    Draining,
    /// All in-flight requests completed.
    Stopped,
}

impl LifecycleState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

/// Coordinates graceful shutdown: readiness probes read the state, the
/// request boundary tracks in-flight requests through RAII guards, and the
/// serve loop waits for the drain to finish.
#[derive(Debug)]
pub struct ShutdownController {
    state: ArcSwap<LifecycleState>,
    in_flight: Arc<AtomicU64>,
}

impl ShutdownController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(LifecycleState::Starting),
            in_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Transitions to `Ready`.
    pub fn set_ready(&self) {
        self.state.store(Arc::new(LifecycleState::Ready));
    }

    /// Transitions to `Draining`; new requests should be rejected by the
    /// readiness probe from here on.
    pub fn trigger_shutdown(&self) {
        self.state.store(Arc::new(LifecycleState::Draining));
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        **self.state.load()
    }

    /// RAII guard tracking one in-flight request.
    ///
    /// The counter is decremented when the guard drops, even if the
    /// request handler panics.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Current number of in-flight requests.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Waits for in-flight requests to complete, up to `timeout`.
    ///
    /// Returns `true` on a full drain (state becomes `Stopped`); `false` if
    /// the timeout expired (state stays `Draining`).
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.in_flight.load(Ordering::Relaxed) == 0 {
                self.state.store(Arc::new(LifecycleState::Stopped));
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
