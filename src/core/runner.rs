//! # Per-task workers.
//!
//! [`Provider::run`](crate::Provider::run) starts two workers for every task:
//!
//! ```text
//! execute:  task.run(ctx) ──► Ok / Canceled / DeadlineExceeded ──► None
//!                         ├─► any other error ──────────────────► Some(TaskFailure)
//!                         └─► panic (caught) ───────────────────► Some(TaskFailure { Fatal })
//!
//! relay:    loop {
//!             select! { ctx.cancelled() → exit,
//!                       sub.recv()      → None: exit | Some(ev) → bus.emit(ev.with_source(key)) }
//!           }
//! ```
//!
//! ## Rules
//! - Neither worker cancels anything: one task's failure never stops its siblings.
//! - The relay stops on cancellation even while waiting on a slow subscriber.
//! - Events are stamped with the emitting task's key before they reach the bus.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{TaskError, TaskFailure};
use crate::events::{PubSub, Subscription};
use crate::tasks::{TaskKey, TaskRef};

/// Runs `task` to completion and reports a failure that is not a cancellation.
pub(crate) async fn execute(
    key: TaskKey,
    task: TaskRef,
    ctx: CancellationToken,
) -> Option<TaskFailure> {
    debug!(task = %key, "task starting");
    let outcome = match AssertUnwindSafe(task.run(ctx)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(TaskError::Fatal {
            error: format!("task panicked: {}", panic_message(&*panic)),
        }),
    };
    match outcome {
        Ok(()) => {
            debug!(task = %key, "task stopped");
            None
        }
        Err(e) if e.is_cancellation() => {
            debug!(task = %key, reason = e.as_label(), "task stopped");
            None
        }
        Err(error) => {
            warn!(task = %key, error = %error, label = error.as_label(), "task failed");
            Some(TaskFailure { key, error })
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Forwards events from one task's subscription into the provider's bus.
pub(crate) async fn relay(
    key: TaskKey,
    mut sub: Subscription,
    bus: Arc<PubSub>,
    ctx: CancellationToken,
) -> Option<TaskFailure> {
    loop {
        let ev = tokio::select! {
            _ = ctx.cancelled() => break,
            ev = sub.recv() => match ev {
                Some(ev) => ev.with_source(key.clone()),
                None => break,
            },
        };
        trace!(task = %key, seq = ev.seq, "relaying event");
        let seq = ev.seq;
        tokio::select! {
            _ = ctx.cancelled() => break,
            delivered = bus.emit(ev) => {
                if !delivered {
                    warn!(task = %key, seq, "event not delivered to every subscriber");
                }
            }
        }
    }
    None
}
