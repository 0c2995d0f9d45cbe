//! Task-local context store (the MDC).
//!
//! One context cell exists per logical unit of work, established with
//! [`scope`] (or [`sync_scope`]). Code running inside the scope reads and
//! writes the cell directly through the free functions here; two scopes
//! running concurrently never observe each other's contents, even when
//! multiplexed on the same OS thread or executed by a reused pooled worker
//! task. There is no global fallback store.
//!
//! Outside any scope, reads return `None` and writes are discarded (a
//! `debug!` records the drop). All request and worker-pool execution paths
//! run inside scopes, so this only ever affects misuse.

use std::cell::RefCell;

use crate::context::{ContextSnapshot, DiagnosticContext};

/// Fixed context keys installed by the request boundary.
pub mod keys {
    /// Correlates all log lines emitted while handling one request.
    pub const REQUEST_ID: &str = "requestId";
    /// Authenticated user identity, or the `anonymous` sentinel.
    pub const USER_ID: &str = "userId";
}

tokio::task_local! {
    static ACTIVE: RefCell<DiagnosticContext>;
}

/// Runs `work` with a fresh, isolated context cell.
///
/// The cell lives exactly as long as the returned future; nothing it holds
/// can outlive the unit of work.
pub async fn scope<F>(work: F) -> F::Output
where
    F: std::future::Future,
{
    ACTIVE.scope(RefCell::new(DiagnosticContext::new()), work).await
}

/// Synchronous variant of [`scope`] for non-async callers and tests.
pub fn sync_scope<F, T>(work: F) -> T
where
    F: FnOnce() -> T,
{
    ACTIVE.sync_scope(RefCell::new(DiagnosticContext::new()), work)
}

/// Whether a context cell is available in the current execution context.
#[must_use]
pub fn in_scope() -> bool {
    ACTIVE.try_with(|_| ()).is_ok()
}

/// Inserts or overwrites a key in the current store.
pub fn put(key: impl Into<String>, value: impl Into<String>) {
    let key = key.into();
    let value = value.into();
    let result = ACTIVE.try_with(|cell| cell.borrow_mut().put(key.as_str(), value.as_str()));
    if result.is_err() {
        tracing::debug!(key = %key, "context write outside any scope, discarded");
    }
}

/// Reads a key from the current store. Never blocks, never fails; `None`
/// outside any scope.
#[must_use]
pub fn get(key: &str) -> Option<String> {
    ACTIVE
        .try_with(|cell| cell.borrow().get(key).map(str::to_owned))
        .ok()
        .flatten()
}

/// Removes a key from the current store; no-op if absent.
pub fn remove(key: &str) {
    let _ = ACTIVE.try_with(|cell| cell.borrow_mut().remove(key));
}

/// Removes all keys from the current store; safe when already empty or
/// outside any scope.
pub fn clear() {
    let _ = ACTIVE.try_with(|cell| cell.borrow_mut().clear());
}

/// Captures an immutable snapshot of the current store, or `None` when the
/// store is empty or no scope is active.
#[must_use]
pub fn capture() -> Option<ContextSnapshot> {
    ACTIVE
        .try_with(|cell| cell.borrow().snapshot())
        .ok()
        .flatten()
}

/// Replaces the entire current mapping with the snapshot's contents.
///
/// An absent snapshot (`None`) clears the store: a reused execution context
/// must not keep stale data from a previous unit of work.
pub fn install(snapshot: Option<ContextSnapshot>) {
    let result = ACTIVE.try_with(|cell| {
        let mut ctx = cell.borrow_mut();
        match snapshot {
            Some(snap) => ctx.restore(snap),
            None => ctx.clear(),
        }
    });
    if result.is_err() {
        tracing::debug!("context install outside any scope, discarded");
    }
}

/// Clears the current store when dropped.
///
/// Held across a unit of work, it guarantees the store is emptied on every
/// exit path, including panics and cancellation.
#[derive(Debug, Default)]
pub struct ClearGuard {
    _priv: (),
}

impl ClearGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Drop for ClearGuard {
    fn drop(&mut self) {
        clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_scope_reads_none_and_writes_are_discarded() {
        assert!(!in_scope());
        put("requestId", "ignored");
        assert_eq!(get("requestId"), None);
        assert!(capture().is_none());
        // Neither of these may panic outside a scope.
        remove("requestId");
        clear();
        install(None);
    }

    #[test]
    fn sync_scope_reads_and_writes_one_cell() {
        sync_scope(|| {
            assert!(in_scope());
            put(keys::REQUEST_ID, "r-1");
            put(keys::USER_ID, "u-1");
            assert_eq!(get(keys::REQUEST_ID).as_deref(), Some("r-1"));

            remove(keys::USER_ID);
            assert_eq!(get(keys::USER_ID), None);

            clear();
            assert_eq!(get(keys::REQUEST_ID), None);
        });
    }

    #[test]
    fn capture_and_install_round() {
        sync_scope(|| {
            assert!(capture().is_none());

            put(keys::REQUEST_ID, "r-1");
            let snapshot = capture().expect("non-empty store must snapshot");

            put("extra", "x");
            install(Some(snapshot));
            assert_eq!(get(keys::REQUEST_ID).as_deref(), Some("r-1"));
            // Install replaces the whole mapping, not just overlapping keys.
            assert_eq!(get("extra"), None);

            install(None);
            assert!(capture().is_none());
        });
    }

    #[test]
    fn clear_guard_clears_on_drop() {
        sync_scope(|| {
            put(keys::REQUEST_ID, "r-1");
            {
                let _guard = ClearGuard::new();
                assert_eq!(get(keys::REQUEST_ID).as_deref(), Some("r-1"));
            }
            assert_eq!(get(keys::REQUEST_ID), None);
        });
    }

    #[tokio::test]
    async fn concurrent_scopes_are_isolated() {
        let first = scope(async {
            put(keys::REQUEST_ID, "a");
            tokio::task::yield_now().await;
            get(keys::REQUEST_ID)
        });
        let second = scope(async {
            put(keys::REQUEST_ID, "b");
            tokio::task::yield_now().await;
            get(keys::REQUEST_ID)
        });

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first.as_deref(), Some("a"));
        assert_eq!(second.as_deref(), Some("b"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn spawned_scopes_are_isolated() {
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        let writer = tokio::spawn(scope(async move {
            put(keys::REQUEST_ID, "writer");
            let _ = ready_tx.send(());
            // Hold the scope open until the reader has looked.
            let _ = done_rx.await;
            get(keys::REQUEST_ID)
        }));

        let reader = tokio::spawn(scope(async move {
            let _ = ready_rx.await;
            let observed = get(keys::REQUEST_ID);
            let _ = done_tx.send(());
            observed
        }));

        assert_eq!(reader.await.unwrap(), None);
        assert_eq!(writer.await.unwrap().as_deref(), Some("writer"));
    }

    #[tokio::test]
    async fn scope_cell_does_not_survive_reentry() {
        scope(async {
            put("sticky", "v");
        })
        .await;
        scope(async {
            assert_eq!(get("sticky"), None);
        })
        .await;
    }
}
