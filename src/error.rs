//! Error types used by the provider, the tasks it hosts, and the router.
//!
//! This module defines three enums:
//!
//! - [`Error`]: construction and registration failures (bad identifiers, duplicates, ...).
//! - [`TaskError`]: errors returned by [`Task::run`](crate::Task::run).
//! - [`RuntimeError`]: the aggregate returned by [`Provider::run`](crate::Provider::run).
//!
//! All of them provide `as_label` for logs/metrics.

use std::fmt;

use thiserror::Error;

use crate::tasks::TaskKey;

/// # Construction and registration errors.
///
/// Returned synchronously by [`Provider::new_task`](crate::Provider::new_task),
/// by plugin constructors, and by router registration. A failure aborts only the
/// call that produced it; already registered tasks are not affected.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed identifier or missing required argument.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// Name, label, type binding, or middleware collision.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Missing task, middleware, or route prefix.
    #[error("not found: {0}")]
    NotFound(String),

    /// A plugin violated its construction contract.
    #[error("internal application error: {0}")]
    InternalAppError(String),
}

impl Error {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskhost::Error;
    ///
    /// let err = Error::DuplicateEntry("router.router".into());
    /// assert_eq!(err.as_label(), "duplicate_entry");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::BadParameter(_) => "bad_parameter",
            Error::DuplicateEntry(_) => "duplicate_entry",
            Error::NotFound(_) => "not_found",
            Error::InternalAppError(_) => "internal_app_error",
        }
    }
}

/// # Errors returned by a running task.
///
/// [`TaskError::Canceled`] and [`TaskError::DeadlineExceeded`] are the expected
/// way for a task to report that the shared cancellation signal fired; the
/// runtime drops them from the aggregate.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task failed; siblings keep running.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task hit an unrecoverable condition.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Task observed cancellation.
    #[error("context cancelled")]
    Canceled,

    /// Task observed a deadline.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Canceled => "task_canceled",
            TaskError::DeadlineExceeded => "task_deadline_exceeded",
        }
    }

    /// Indicates whether the error only reports cancellation or a deadline.
    ///
    /// # Example
    /// ```
    /// use taskhost::TaskError;
    ///
    /// assert!(TaskError::Canceled.is_cancellation());
    /// assert!(!TaskError::fail("boom").is_cancellation());
    /// ```
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TaskError::Canceled | TaskError::DeadlineExceeded)
    }
}

/// A single task failure, tagged with the task it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Key of the failing task.
    pub key: TaskKey,
    /// Error returned by its `run`.
    pub error: TaskError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.error)
    }
}

/// # Errors produced by the runtime.
///
/// Reported once every task has exited; never used to cancel siblings early.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// One or more tasks returned a non-cancellation error.
    #[error("{} task(s) failed: {}", failures.len(), join(failures))]
    TasksFailed {
        /// Every failure, in the order the tasks exited.
        failures: Vec<TaskFailure>,
    },

    /// [`Provider::run`](crate::Provider::run) was called a second time.
    #[error("provider already ran")]
    AlreadyStarted,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::TasksFailed { .. } => "runtime_tasks_failed",
            RuntimeError::AlreadyStarted => "runtime_already_started",
        }
    }

    /// Returns the individual failures.
    pub fn failures(&self) -> &[TaskFailure] {
        match self {
            RuntimeError::TasksFailed { failures } => failures,
            RuntimeError::AlreadyStarted => &[],
        }
    }
}

fn join(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
