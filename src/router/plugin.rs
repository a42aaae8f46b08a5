use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::router::Router;
use crate::core::Provider;
use crate::error::{Error, TaskError};
use crate::identifier::is_identifier;
use crate::tasks::{Task, TaskPlugin};

/// Plugin name, and the label used when none is configured.
pub const ROUTER_NAME: &str = "router";

/// Configuration for a [`Router`] task.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RouterConfig {
    /// Instance label (`""` = `router`).
    pub label: String,
}

impl TaskPlugin for RouterConfig {
    type Task = Router;

    fn name(&self) -> &str {
        ROUTER_NAME
    }

    fn label(&self) -> &str {
        if self.label.is_empty() {
            ROUTER_NAME
        } else {
            &self.label
        }
    }

    fn new_task(self, _: &CancellationToken, _: &mut Provider) -> Result<Arc<Router>, Error> {
        let label = self.label();
        if !is_identifier(label) {
            return Err(Error::BadParameter(format!("label: {label:?}")));
        }
        Ok(Arc::new(Router::new(label)))
    }
}

/// The router does no work of its own; it serves whoever calls
/// [`Router::handle`] until cancellation.
#[async_trait]
impl Task for Router {
    fn label(&self) -> &str {
        Router::label(self)
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), TaskError> {
        ctx.cancelled().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_label() {
        let mut provider = Provider::new();
        let ctx = CancellationToken::new();
        let router = provider.new_task(&ctx, RouterConfig::default()).unwrap();
        assert_eq!(Task::label(router.as_ref()), "router");
        assert!(provider.task_with_label("router", "router").is_some());
    }

    #[test]
    fn test_config_from_json() {
        let cfg: RouterConfig = serde_json::from_str(r#"{"label": "main"}"#).unwrap();
        assert_eq!(cfg.label(), "main");
        let cfg: RouterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.label(), "router");
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let router = Router::new("router");
        let ctx = CancellationToken::new();
        ctx.cancel();
        assert_eq!(router.run(ctx).await, Ok(()));
    }
}
