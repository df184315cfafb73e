//! Cooperative task scheduling on top of a tokio runtime.
//!
//! A [`Scheduler`] runs futures as tokio tasks, delays them, and cancels everything it
//! started when it is shut down. Schedulers form a tree through [`Scheduler::child`]:
//! each connection gets its own child, so closing one connection cancels only the work
//! done on its behalf while shutting the server down cancels all of it.
//!
//! ```
//! # #[tokio::main]
//! # async fn main() {
//! use std::time::Duration;
//! use micro_http_semantics::scheduler::Scheduler;
//!
//! let scheduler = Scheduler::current();
//! let task = scheduler.schedule(Duration::from_millis(10), async { 42 });
//! assert_eq!(task.await, Ok(42));
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::trace;

use crate::protocol::TaskError;

/// Handle to a set of cancellable tasks running on a tokio runtime.
///
/// Cloning is cheap, clones share the same tasks and cancellation state.
#[derive(Debug, Clone)]
pub struct Scheduler {
    handle: Handle,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Scheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle, token: CancellationToken::new(), tracker: TaskTracker::new() }
    }

    /// Scheduler on the runtime of the calling task.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Runs `future` as a new task.
    ///
    /// The task resolves to [`TaskError::Cancelled`] if this scheduler is shut down, or
    /// the task cancelled, before `future` completes. Submitting to a scheduler that is
    /// already shut down yields a task that is cancelled right away.
    pub fn submit<F>(&self, future: F) -> ScheduledTask<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let token = self.token.child_token();
        let task_token = token.clone();
        let handle = self.tracker.spawn_on(
            async move {
                tokio::select! {
                    biased;
                    () = task_token.cancelled() => Err(TaskError::Cancelled),
                    output = future => Ok(output),
                }
            },
            &self.handle,
        );

        ScheduledTask { handle, token }
    }

    /// Runs `future` as a new task once `delay` has elapsed.
    pub fn schedule<F>(&self, delay: Duration, future: F) -> ScheduledTask<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.submit(async move {
            tokio::time::sleep(delay).await;
            future.await
        })
    }

    /// Waits for `delay`, or fails with [`TaskError::Cancelled`] if the scheduler is shut
    /// down first.
    pub async fn sleep(&self, delay: Duration) -> Result<(), TaskError> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(TaskError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }

    /// A scheduler cancelled together with this one, which can also be shut down on its own.
    pub fn child(&self) -> Scheduler {
        Scheduler { handle: self.handle.clone(), token: self.token.child_token(), tracker: TaskTracker::new() }
    }

    /// Cancels every task of this scheduler and of its children.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            trace!(tasks = self.tracker.len(), "shutting down scheduler");
        }
        self.token.cancel();
        self.tracker.close();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once this scheduler, or one of its ancestors, is shut down.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Waits for every task submitted to this scheduler to finish.
    ///
    /// Tasks submitted while waiting are waited for as well.
    pub async fn join(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// A task started by a [`Scheduler`].
///
/// Resolves to the output of the task, or to the [`TaskError`] that prevented it. Dropping
/// a `ScheduledTask` detaches the task without cancelling it.
#[derive(Debug)]
pub struct ScheduledTask<T> {
    handle: JoinHandle<Result<T, TaskError>>,
    token: CancellationToken,
}

impl<T> ScheduledTask<T> {
    /// Cancels this task only, the task then resolves to [`TaskError::Cancelled`] unless
    /// it has already completed.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Future for ScheduledTask<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|result| match result {
            Ok(output) => output,
            Err(e) if e.is_panic() => Err(TaskError::Panicked),
            Err(_) => Err(TaskError::Cancelled),
        })
    }
}
