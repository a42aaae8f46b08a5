//! # Task abstractions and plugins.
//!
//! This module provides the core task-related types:
//! - [`Task`] - trait for live, cancelable, optionally event-emitting tasks
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)
//! - [`TaskPlugin`] - inert configuration that constructs a task
//! - [`TaskKey`] - `(name, label)` identity of a registered task
//! - [`BasicTaskConfig`] / [`BasicTask`] - minimal reference plugin

mod basic;
mod key;
mod plugin;
mod task;

pub use basic::{BASIC_TASK_NAME, BasicTask, BasicTaskConfig};
pub use key::TaskKey;
pub use plugin::TaskPlugin;
pub use task::{Task, TaskRef};
