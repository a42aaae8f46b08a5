//! # Fan-out broadcaster.
//!
//! [`PubSub`] holds zero or more subscriber channels and delivers every emitted
//! event to each of them.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │  (snapshot senders under lock, deliver outside it)
//!     ├──► [sub 1] cap 0  ──► waits until received
//!     ├──► [sub 2] cap N  ──► try_send, full → skipped, emit() = false
//!     └──► [sub N] ...
//!
//! close()
//!     └──► drops every sender: each Subscription drains, then yields None
//! ```
//!
//! ## Rules
//! - **Per-subscriber FIFO**: a subscriber sees events from one emitter in emission order.
//! - **Partial failure**: a full buffered subscriber is skipped; delivery to the rest continues.
//! - **Close**: clears the subscriber set; a closed bus can be subscribed to again.
//! - **Misuse**: unsubscribing a subscription this bus never handed out panics.

use std::fmt;

use parking_lot::Mutex;
use tracing::trace;

use super::channel::{EventSender, Subscription, channel};
use super::event::Event;

/// Publish/subscribe hub for [`Event`]s.
///
/// Tasks usually hold one and return [`PubSub::subscribe`] from
/// [`Task::subscribe`](crate::Task::subscribe).
#[derive(Default)]
pub struct PubSub {
    cap: usize,
    subscribers: Mutex<Vec<EventSender>>,
}

impl PubSub {
    /// Creates a bus whose subscriber channels hold `cap` events (`0` = synchronous hand-off).
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Capacity given to each new subscriber channel.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    /// Allocates a new subscriber channel that receives all subsequently emitted events.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = channel(self.cap);
        trace!(id = tx.id(), cap = self.cap, "subscribe");
        self.subscribers.lock().push(tx);
        rx
    }

    /// Closes and removes exactly this subscription's channel.
    ///
    /// # Panics
    /// If `sub` is not currently subscribed to this bus.
    pub fn unsubscribe(&self, sub: &Subscription) {
        let mut subscribers = self.subscribers.lock();
        match subscribers.iter().position(|tx| tx.id() == sub.id()) {
            Some(i) => {
                subscribers.remove(i);
                trace!(id = sub.id(), "unsubscribe");
            }
            None => panic!("unsubscribe called for unsubscribed channel {}", sub.id()),
        }
    }

    /// Sends `event` to every subscriber.
    ///
    /// Returns `true` if every subscriber took the event. Subscribers with zero
    /// capacity are waited for; buffered subscribers that are full are skipped
    /// and make the result `false`.
    pub async fn emit(&self, event: Event) -> bool {
        let targets: Vec<EventSender> = self.subscribers.lock().clone();
        let mut result = true;
        for tx in &targets {
            if !event.clone().emit(tx).await {
                result = false;
            }
        }
        result
    }

    /// Closes every subscriber channel and clears the subscriber set.
    ///
    /// Always returns `true`.
    pub fn close(&self) -> bool {
        let closed: Vec<EventSender> = std::mem::take(&mut *self.subscribers.lock());
        trace!(count = closed.len(), "close");
        true
    }
}

impl fmt::Debug for PubSub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSub")
            .field("cap", &self.cap)
            .field("subscribers", &self.len())
            .finish()
    }
}
