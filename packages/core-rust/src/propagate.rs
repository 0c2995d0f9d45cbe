//! Carries a context snapshot into work that runs in another execution
//! context.
//!
//! Within one synchronous call chain the store is read directly and no copy
//! is involved. The moment work is handed to a separately scheduled
//! executor, that link is lost: the destination context starts with
//! whatever its (possibly reused) cell last held. [`wrap`] restores the
//! link explicitly: snapshot at hand-off time, install at execution time,
//! guaranteed clear afterward.

use std::future::Future;

use crate::context::ContextSnapshot;
use crate::mdc::{self, ClearGuard};

/// Wraps a unit of work so it carries the caller's context.
///
/// The snapshot is taken when `wrap` is called, in the originating context.
/// When the returned future is eventually executed -- possibly much later,
/// on a different execution context, concurrently with other wrapped units:
///
/// 1. a non-absent snapshot is installed into the executing context's
///    store (an absent one installs nothing, so pre-existing values stay
///    visible while the work runs);
/// 2. the work runs, its outcome propagating unchanged -- no retries;
/// 3. the executing store is cleared on every exit path, including panics
///    and cancellation, so a reused pooled context never leaks into
///    unrelated subsequent work.
///
/// If the executing context has no cell at all (a bare `tokio::spawn`
/// rather than a pool worker), the same sequence runs inside a fresh scope.
pub fn wrap<F>(work: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let snapshot = mdc::capture();
    async move {
        if mdc::in_scope() {
            run_with(snapshot, work).await
        } else {
            tracing::debug!("no context cell in executing task, running in a fresh scope");
            mdc::scope(run_with(snapshot, work)).await
        }
    }
}

async fn run_with<F>(snapshot: Option<ContextSnapshot>, work: F) -> F::Output
where
    F: Future,
{
    let _cleanup = ClearGuard::new();
    if snapshot.is_some() {
        mdc::install(snapshot);
    }
    work.await
}
