//! # Provider: task registry, concurrent runtime, and event relay.
//!
//! The [`Provider`] turns plugin configurations into live tasks, then runs
//! them all at once until the shared cancellation token fires.
//!
//! ## High-level architecture
//! ```text
//! Construction (single writer, synchronous):
//!   provider.new_task(ctx, plugin)
//!     ├─► validate name, bind name → plugin type
//!     ├─► validate label, reject existing (name, label)
//!     ├─► plugin.new_task(ctx, provider)  ── may recurse into provider.get_or_new(...)
//!     └─► register (name, label) → task
//!
//! Run (all tasks, no ordering):
//!   for each task:
//!     relay:   task.subscribe() ──► PubSub (provider bus) ──► provider.subscribe() consumers
//!     execute: task.run(ctx) ──► Option<TaskFailure>
//!   ctx.cancelled() → every worker exits → JoinSet drained
//!   bus.close() → every subscriber sees the end of its stream
//!   return Ok(()) or RuntimeError::TasksFailed { failures }
//! ```
//!
//! ## Rules
//! - Construction order is dependency order; run order is unordered.
//! - A failing task does not cancel its siblings; errors are reported after all exit.
//! - A task that ignores cancellation keeps `run` from returning.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use taskhost::{BasicTaskConfig, Provider, RouterConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = CancellationToken::new();
//!     let mut provider = Provider::new();
//!     provider.new_task(&ctx, RouterConfig::default())?;
//!     provider.new_task(&ctx, BasicTaskConfig { label: "task0".into() })?;
//!
//!     let stop = ctx.clone();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(50)).await;
//!         stop.cancel();
//!     });
//!     provider.run(ctx).await?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::core::registry::Registry;
use crate::core::runner;
use crate::error::{Error, RuntimeError, TaskFailure};
use crate::events::{PubSub, Subscription};
use crate::identifier::is_identifier;
use crate::tasks::{Task, TaskKey, TaskPlugin, TaskRef};

/// Registry and concurrent runtime for tasks.
pub struct Provider {
    cfg: ProviderConfig,
    registry: Registry,
    bus: Arc<PubSub>,
    started: AtomicBool,
}

impl Provider {
    /// Creates an empty provider with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ProviderConfig::default())
    }

    /// Creates an empty provider.
    pub fn with_config(cfg: ProviderConfig) -> Self {
        let bus = Arc::new(PubSub::new(cfg.bus_capacity));
        Self {
            cfg,
            registry: Registry::default(),
            bus,
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.cfg
    }

    /// Constructs a task from `plugin` and registers it under `(name, label)`.
    ///
    /// The plugin's constructor receives this provider and may construct or
    /// look up the tasks it depends on before returning its own.
    ///
    /// # Errors
    /// - [`Error::BadParameter`]: name or label does not match the identifier grammar
    /// - [`Error::DuplicateEntry`]: name bound to another plugin type, or `(name, label)` taken
    /// - [`Error::InternalAppError`]: the constructed task reports a different label
    /// - any error returned by the plugin's constructor
    pub fn new_task<P: TaskPlugin>(
        &mut self,
        ctx: &CancellationToken,
        plugin: P,
    ) -> Result<Arc<P::Task>, Error> {
        let name = plugin.name().to_owned();
        if !is_identifier(&name) {
            return Err(Error::BadParameter(format!("invalid name {name:?} for plugin")));
        }
        self.registry.bind_plugin::<P>(&name)?;

        let label = plugin.label().to_owned();
        if !is_identifier(&label) {
            return Err(Error::BadParameter(format!(
                "invalid label {label:?} for task {name:?}"
            )));
        }
        let key = TaskKey::new(name, label);
        if self.registry.contains(&key) {
            return Err(Error::DuplicateEntry(format!("task {key} already exists")));
        }

        let task = plugin.new_task(ctx, self)?;
        if task.label() != key.label() {
            return Err(Error::InternalAppError(format!(
                "plugin for {key} constructed a task labelled {:?}",
                task.label()
            )));
        }

        // A dependency constructed above may have claimed the key.
        self.registry.insert(key.clone(), Arc::clone(&task))?;
        debug!(task = %key, "task registered");
        Ok(task)
    }

    /// Returns the task already registered for the plugin's `(name, label)`,
    /// or constructs it with [`new_task`](Self::new_task).
    ///
    /// # Errors
    /// [`Error::DuplicateEntry`] if the registered task was built by another plugin type.
    pub fn get_or_new<P: TaskPlugin>(
        &mut self,
        ctx: &CancellationToken,
        plugin: P,
    ) -> Result<Arc<P::Task>, Error> {
        let key = TaskKey::new(plugin.name(), plugin.label());
        if !self.registry.contains(&key) {
            return self.new_task(ctx, plugin);
        }
        self.registry.bind_plugin::<P>(key.name())?;
        self.registry
            .get(&key)
            .and_then(|entry| entry.downcast::<P::Task>())
            .ok_or_else(|| Error::DuplicateEntry(format!("task {key} has a different type")))
    }

    /// Returns the task registered under `(name, label)` as its concrete type.
    pub fn get<T: Task>(&self, name: &str, label: &str) -> Option<Arc<T>> {
        self.registry
            .get(&TaskKey::new(name, label))
            .and_then(|entry| entry.downcast::<T>())
    }

    /// Returns the task registered under `(name, label)`.
    pub fn task_with_label(&self, name: &str, label: &str) -> Option<TaskRef> {
        self.registry
            .get(&TaskKey::new(name, label))
            .map(|entry| Arc::clone(&entry.task))
    }

    /// Returns every task constructed by plugin `name`, or every task if `name` is empty.
    pub fn tasks_with_name(&self, name: &str) -> Vec<TaskRef> {
        self.registry
            .entries()
            .filter(|entry| name.is_empty() || entry.key.name() == name)
            .map(|entry| Arc::clone(&entry.task))
            .collect()
    }

    /// Keys of all registered tasks, in construction order.
    pub fn keys(&self) -> Vec<TaskKey> {
        self.registry.entries().map(|e| e.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    /// Subscribes to the events relayed from every task.
    ///
    /// The subscription ends when [`run`](Self::run) returns.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// # Panics
    /// If `sub` was not returned by [`subscribe`](Self::subscribe) or is already unsubscribed.
    pub fn unsubscribe(&self, sub: &Subscription) {
        self.bus.unsubscribe(sub)
    }

    /// Runs every registered task concurrently until `ctx` is cancelled and
    /// every task has exited.
    ///
    /// Closes the event bus on the way out. A provider runs once.
    ///
    /// # Errors
    /// - [`RuntimeError::TasksFailed`] with every error that was not a cancellation
    /// - [`RuntimeError::AlreadyStarted`] if `run` was called before
    pub async fn run(&self, ctx: CancellationToken) -> Result<(), RuntimeError> {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("provider already started");
            return Err(RuntimeError::AlreadyStarted);
        }
        info!(tasks = self.registry.len(), "provider starting");
        let mut set: JoinSet<Option<TaskFailure>> = JoinSet::new();

        // Subscribe every relay before any task starts emitting.
        let relays: Vec<(TaskKey, Subscription)> = self
            .registry
            .entries()
            .filter_map(|entry| entry.task.subscribe().map(|sub| (entry.key.clone(), sub)))
            .collect();
        for (key, sub) in relays {
            set.spawn(runner::relay(key, sub, Arc::clone(&self.bus), ctx.clone()));
        }
        for entry in self.registry.entries() {
            set.spawn(runner::execute(
                entry.key.clone(),
                Arc::clone(&entry.task),
                ctx.clone(),
            ));
        }

        let mut failures = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Some(failure)) => failures.push(failure),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "worker aborted"),
            }
        }

        self.bus.close();
        info!(failed = failures.len(), "provider stopped");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::TasksFailed { failures })
        }
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("tasks", &self.keys())
            .field("bus", &self.bus)
            .finish()
    }
}
