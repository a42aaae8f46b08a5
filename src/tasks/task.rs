//! # Task abstraction.
//!
//! This module defines the [`Task`] trait (async, cancelable, optionally
//! emitting events). The common handle type is [`TaskRef`], an `Arc<dyn Task>`
//! suitable for sharing across the runtime.
//!
//! A task receives a [`CancellationToken`] and should watch it to stop
//! cooperatively: a task that ignores it blocks the provider's shutdown.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::events::Subscription;

/// Shared handle to a live task.
pub type TaskRef = Arc<dyn Task>;

/// # Live, running component hosted by the provider.
///
/// A `Task` has a stable [`label`](Task::label), an async [`run`](Task::run)
/// method that blocks until cancellation or a fatal error, and an optional
/// private event stream exposed through [`subscribe`](Task::subscribe).
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use taskhost::{Task, TaskError};
///
/// struct Idle;
///
/// #[async_trait]
/// impl Task for Idle {
///     fn label(&self) -> &str { "idle" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
///         ctx.cancelled().await;
///         Err(TaskError::Canceled)
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Instance label, unique within the task's plugin name.
    fn label(&self) -> &str;

    /// Runs until `ctx` is cancelled or a fatal error occurs.
    ///
    /// Returning [`TaskError::Canceled`] or [`TaskError::DeadlineExceeded`] is
    /// treated the same as `Ok(())`.
    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError>;

    /// Returns a new subscription to this task's events, or `None` if the task
    /// emits nothing.
    fn subscribe(&self) -> Option<Subscription> {
        None
    }
}
