//! # Task plugins: inert configurations that produce tasks.
//!
//! A [`TaskPlugin`] is consumed once by
//! [`Provider::new_task`](crate::Provider::new_task). Its constructor receives
//! the provider itself, which is how dependencies are resolved:
//!
//! ```text
//! provider.new_task(ctx, GatewayConfig)
//!     └─► GatewayConfig::new_task(ctx, provider)
//!             ├─► provider.get_or_new(ctx, RouterConfig)   (dependency first)
//!             ├─► router.add_handler(...)
//!             └─► Ok(Arc<Gateway>)                        (registered last)
//! ```
//!
//! Construction order is dependency order. Run order is unordered: every task
//! starts together once [`Provider::run`](crate::Provider::run) is called.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::Provider;
use crate::error::Error;
use crate::tasks::Task;

/// Configuration value that constructs a [`Task`].
///
/// The implementing type is the plugin's type token: the first plugin
/// registered under a [`name`](TaskPlugin::name) binds that name to its type,
/// and any other type using the same name is rejected.
pub trait TaskPlugin: Send + 'static {
    /// Concrete task produced by this plugin.
    type Task: Task;

    /// Plugin class identifier.
    fn name(&self) -> &str;

    /// Instance identifier. Defaults to the plugin name.
    fn label(&self) -> &str {
        self.name()
    }

    /// Builds the task, constructing or looking up any dependency through `provider`.
    ///
    /// The returned task's [`label`](Task::label) must equal [`label`](TaskPlugin::label).
    fn new_task(
        self,
        ctx: &CancellationToken,
        provider: &mut Provider,
    ) -> Result<Arc<Self::Task>, Error>;
}
