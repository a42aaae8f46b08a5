//! Events: message type, channels, and the fan-out bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! broadcast events from tasks to anyone interested.
//!
//! ## Contents
//! - [`Event`] key/value-or-error message with its delivery primitive [`Event::emit`]
//! - [`channel`], [`EventSender`], [`Subscription`] single sender/receiver pairs
//! - [`PubSub`] fan-out to many subscriptions
//!
//! ## Quick reference
//! - **Publishers**: tasks (each owns a private `PubSub`), and the provider's
//!   relay workers which forward task events into the provider's bus.
//! - **Consumers**: whoever called [`Provider::subscribe`](crate::Provider::subscribe),
//!   and the relay workers themselves (one subscription per task).
//!
//! See `core/mod.rs` for the system-level wiring diagram.

mod channel;
mod event;
mod pubsub;

pub use channel::{EventSender, Subscription, channel};
pub use event::Event;
pub use pubsub::PubSub;
