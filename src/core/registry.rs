//! # Task registry.
//!
//! Two maps, both written only during construction:
//! - `plugins`: plugin name → type token of the first plugin registered under it
//! - `tasks`: `(name, label)` → live task, kept in construction order
//!
//! ## Rules
//! - A plugin name denotes one plugin type for the registry's lifetime.
//! - A `(name, label)` key identifies at most one task.
//! - Iteration follows construction order (dependencies before dependents).

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::tasks::{Task, TaskKey, TaskRef};

/// Type token bound to a plugin name.
struct PluginType {
    id: TypeId,
    type_name: &'static str,
}

/// Registered task, held both as a task and as `Any` for typed lookups.
pub(crate) struct Entry {
    pub key: TaskKey,
    pub task: TaskRef,
    any: Arc<dyn Any + Send + Sync>,
}

impl Entry {
    /// Returns the task as its concrete type, if it is a `T`.
    pub fn downcast<T: Task>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.any).downcast::<T>().ok()
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    plugins: HashMap<String, PluginType>,
    index: HashMap<TaskKey, usize>,
    tasks: Vec<Entry>,
}

impl Registry {
    /// Binds `name` to plugin type `P`, or checks it is already bound to `P`.
    pub fn bind_plugin<P: 'static>(&mut self, name: &str) -> Result<(), Error> {
        match self.plugins.get(name) {
            Some(bound) if bound.id == TypeId::of::<P>() => Ok(()),
            Some(bound) => Err(Error::DuplicateEntry(format!(
                "plugin {name:?} already bound to {}, not {}",
                bound.type_name,
                type_name::<P>()
            ))),
            None => {
                debug!(name, plugin = type_name::<P>(), "binding plugin type");
                self.plugins.insert(
                    name.to_owned(),
                    PluginType {
                        id: TypeId::of::<P>(),
                        type_name: type_name::<P>(),
                    },
                );
                Ok(())
            }
        }
    }

    pub fn contains(&self, key: &TaskKey) -> bool {
        self.index.contains_key(key)
    }

    /// Registers a task under `key`.
    pub fn insert<T: Task>(&mut self, key: TaskKey, task: Arc<T>) -> Result<(), Error> {
        if self.contains(&key) {
            return Err(Error::DuplicateEntry(format!("task {key} already exists")));
        }
        self.index.insert(key.clone(), self.tasks.len());
        self.tasks.push(Entry {
            key,
            task: task.clone(),
            any: task,
        });
        Ok(())
    }

    pub fn get(&self, key: &TaskKey) -> Option<&Entry> {
        self.index.get(key).map(|&i| &self.tasks[i])
    }

    /// Entries in construction order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}
