//! # Basic task
//!
//! The smallest useful plugin: emits one `start` event when it begins running,
//! then waits for cancellation. Serves as a reference for task lifecycle and as
//! a placeholder instance in configurations.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use taskhost::{BasicTaskConfig, Provider, Task};
//!
//! let mut provider = Provider::new();
//! let ctx = CancellationToken::new();
//! let task = provider
//!     .new_task(&ctx, BasicTaskConfig { label: "task0".into() })
//!     .unwrap();
//! assert_eq!(task.label(), "task0");
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::core::Provider;
use crate::error::{Error, TaskError};
use crate::events::{Event, PubSub, Subscription};
use crate::identifier::is_identifier;
use crate::tasks::{Task, TaskPlugin};

/// Plugin name, and the label used when none is configured.
pub const BASIC_TASK_NAME: &str = "task";

/// Configuration for a [`BasicTask`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BasicTaskConfig {
    /// Instance label (`""` = plugin name).
    pub label: String,
}

impl TaskPlugin for BasicTaskConfig {
    type Task = BasicTask;

    fn name(&self) -> &str {
        BASIC_TASK_NAME
    }

    fn label(&self) -> &str {
        if self.label.is_empty() {
            BASIC_TASK_NAME
        } else {
            &self.label
        }
    }

    fn new_task(self, _: &CancellationToken, _: &mut Provider) -> Result<Arc<BasicTask>, Error> {
        let label = self.label().to_owned();
        if !is_identifier(&label) {
            return Err(Error::BadParameter(format!("label: {label:?}")));
        }
        Ok(Arc::new(BasicTask {
            label,
            events: PubSub::default(),
        }))
    }
}

/// Task that announces itself and idles until cancelled.
pub struct BasicTask {
    label: String,
    events: PubSub,
}

#[async_trait]
impl Task for BasicTask {
    fn label(&self) -> &str {
        &self.label
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        tokio::select! {
            _ = ctx.cancelled() => {}
            _ = self.events.emit(Event::new("start", "started")) => {
                ctx.cancelled().await;
            }
        }
        self.events.close();
        Ok(())
    }

    fn subscribe(&self) -> Option<Subscription> {
        Some(self.events.subscribe())
    }
}

impl fmt::Display for BasicTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<task label={:?}>", self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_defaults_to_name() {
        let cfg = BasicTaskConfig::default();
        assert_eq!(cfg.label(), "task");
        assert_eq!(cfg.name(), "task");
    }

    #[tokio::test]
    async fn test_emits_start_then_closes() {
        let mut provider = Provider::new();
        let ctx = CancellationToken::new();
        let task = provider
            .new_task(&ctx, BasicTaskConfig { label: "basic".into() })
            .unwrap();
        assert_eq!(task.to_string(), r#"<task label="basic">"#);

        let mut sub = task.subscribe().unwrap();
        let runner = {
            let task = task.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { task.run(ctx).await })
        };

        let ev = sub.recv().await.unwrap();
        assert_eq!(ev.key.as_deref(), Some("start"));
        assert_eq!(ev.value.as_ref().and_then(|v| v.as_str()), Some("started"));

        ctx.cancel();
        assert_eq!(runner.await.unwrap(), Ok(()));
        assert!(sub.recv().await.is_none());
    }
}
