//! Bounded worker pool for delegated units of work.
//!
//! A fixed number of worker tasks pull jobs from one bounded mpsc queue.
//! Each worker runs its loop inside a persistent `mdc::scope`, so its
//! context cell is reused across every job it executes -- the same reuse a
//! pooled thread's thread-local would see. The pool itself is
//! propagation-agnostic: callers submit `logctx_core::wrap(...)`ed futures
//! when the job must carry their context, bare futures when it must not.
//!
//! Saturation rejects (`SubmitError::QueueFull`) instead of blocking, so
//! queue memory stays bounded.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures_util::FutureExt;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use logctx_core::mdc;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

// ---------------------------------------------------------------------------
// Configuration and errors
// ---------------------------------------------------------------------------

/// Worker pool sizing.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker tasks.
    pub workers: usize,
    /// Bounded queue capacity; submissions beyond it are rejected.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 100,
        }
    }
}

/// Submission failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// The queue is at capacity and all workers are busy.
    #[error("worker pool queue is full")]
    QueueFull,
    /// The pool no longer accepts work.
    #[error("worker pool is shut down")]
    Shutdown,
}

/// Failures of a delegated unit of work, delivered through [`TaskHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The job panicked; the panic was caught so the worker survives, and
    /// the failure is surfaced here rather than dropped.
    #[error("delegated task panicked")]
    Panicked,
    /// The job was dropped before it ran (pool torn down).
    #[error("delegated task was dropped before completion")]
    Canceled,
}

// ---------------------------------------------------------------------------
// TaskHandle
// ---------------------------------------------------------------------------

/// Future-like handle to a submitted job's outcome.
///
/// Awaiting it does not touch the submitter's context store; the job and
/// the submitter are fully isolated.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(outcome) => outcome,
            Err(_) => Err(TaskError::Canceled),
        })
    }
}

// ---------------------------------------------------------------------------
// TaskPool
// ---------------------------------------------------------------------------

/// Fixed-size worker pool over one bounded queue.
///
/// Must be created inside a Tokio runtime (workers are spawned eagerly).
#[derive(Debug)]
pub struct TaskPool {
    queue: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    queue_capacity: usize,
}

impl TaskPool {
    /// Starts the pool with the given sizing.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        let (tx, rx) = mpsc::channel::<Job>(config.queue_capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..config.workers)
            .map(|index| {
                let rx = Arc::clone(&rx);
                // The scope around the loop is the worker's persistent
                // context cell, reused across every job it runs.
                tokio::spawn(mdc::scope(worker_loop(index, rx)))
            })
            .collect();

        Self {
            queue: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            worker_count: config.workers,
            queue_capacity: config.queue_capacity,
        }
    }

    /// Submits a unit of work for execution on some worker.
    ///
    /// The job runs to completion or failure once accepted; there is no
    /// mid-flight cancellation. A panicking job is reported through the
    /// returned handle as [`TaskError::Panicked`].
    ///
    /// # Errors
    ///
    /// [`SubmitError::QueueFull`] when the queue is at capacity,
    /// [`SubmitError::Shutdown`] after [`TaskPool::shutdown`].
    pub fn submit<F, T>(&self, work: F) -> Result<TaskHandle<T>, SubmitError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = {
            let guard = self.queue.lock().expect("pool queue mutex poisoned");
            guard.as_ref().cloned()
        };
        let Some(sender) = sender else {
            return Err(SubmitError::Shutdown);
        };

        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(work).catch_unwind().await;
            // The receiver may have been dropped; that is not our problem.
            let _ = tx.send(outcome.map_err(|_| TaskError::Panicked));
        });

        match sender.try_send(job) {
            Ok(()) => {
                counter!("logctx_pool_tasks_submitted_total").increment(1);
                Ok(TaskHandle { rx })
            }
            Err(TrySendError::Full(_)) => {
                counter!("logctx_pool_tasks_rejected_total").increment(1);
                Err(SubmitError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(SubmitError::Shutdown),
        }
    }

    /// Number of jobs currently queued (accepted, not yet picked up).
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue
            .lock()
            .expect("pool queue mutex poisoned")
            .as_ref()
            .map_or(0, |tx| tx.max_capacity() - tx.capacity())
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Graceful shutdown: stops accepting new work, lets the workers drain
    /// everything already queued, then waits for them to finish.
    pub async fn shutdown(&self) {
        {
            let mut guard = self.queue.lock().expect("pool queue mutex poisoned");
            // Dropping the sender closes the channel; workers exit once
            // the queue is drained.
            guard.take();
        }
        let handles: Vec<_> = {
            let mut guard = self.workers.lock().expect("pool workers mutex poisoned");
            guard.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(index: usize, rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>) {
    debug!("pool worker {} started", index);
    loop {
        // Hold the lock only while waiting for a job, never while running one.
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else { break };
        job.await;
        counter!("logctx_pool_tasks_completed_total").increment(1);
    }
    debug!("pool worker {} stopped", index);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
