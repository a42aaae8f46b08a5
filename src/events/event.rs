//! # Events exchanged between tasks and relayed by the provider.
//!
//! An [`Event`] is an immutable key/value-or-error message. Tasks emit events
//! on their private [`PubSub`](crate::PubSub); the provider relays them into its
//! own bus, stamping the source task on the way.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events from several tasks are merged.
//!
//! ## Example
//! ```rust
//! use taskhost::Event;
//!
//! let ev = Event::new("start", "started");
//! assert_eq!(ev.key.as_deref(), Some("start"));
//! assert_eq!(ev.value.as_ref().and_then(|v| v.as_str()), Some("started"));
//! assert!(ev.error.is_none());
//!
//! let err = Event::error("connection refused");
//! assert!(err.is_error());
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use serde_json::Value;

use super::channel::EventSender;
use crate::tasks::TaskKey;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Key/value-or-error message.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `source`: set by the provider when relaying
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Name of what the event is about (`start`, `tick`, ...). Structured
    /// data, including composite keys, belongs in `value`.
    pub key: Option<Arc<str>>,
    /// Payload, any JSON value.
    pub value: Option<Value>,
    /// Error carried by the event, if any.
    pub error: Option<Arc<str>>,
    /// Task that emitted the event, once relayed.
    pub source: Option<TaskKey>,
}

impl Event {
    /// Creates a key/value event.
    pub fn new(key: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        Self::blank().with_key(key).with_value(value)
    }

    /// Creates an event carrying only an error.
    pub fn error(error: impl fmt::Display) -> Self {
        let mut ev = Self::blank();
        ev.error = Some(error.to_string().into());
        ev
    }

    fn blank() -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            key: None,
            value: None,
            error: None,
            source: None,
        }
    }

    /// Attaches a key.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a value.
    #[inline]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Attaches the emitting task.
    #[inline]
    pub fn with_source(mut self, source: TaskKey) -> Self {
        self.source = Some(source);
        self
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Delivers the event on a single channel.
    ///
    /// On a zero-capacity channel this waits until the receiver has taken the
    /// event. On a buffered channel it never waits and returns `false` if the
    /// channel is full. Returns `false` if the receiver is gone.
    pub async fn emit(self, tx: &EventSender) -> bool {
        tx.deliver(self).await
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<event seq={}", self.seq)?;
        if let Some(source) = &self.source {
            write!(f, " source={source}")?;
        }
        if let Some(key) = &self.key {
            write!(f, " key={key}")?;
        }
        match &self.value {
            Some(Value::String(s)) => write!(f, " value={s:?}")?,
            Some(v) => write!(f, " value={v}")?,
            None => {}
        }
        if let Some(error) = &self.error {
            write!(f, " error={error}")?;
        }
        write!(f, ">")
    }
}
