//! # Event channels.
//!
//! [`channel`] creates one sender/receiver pair. The capacity decides how
//! [`Event::emit`] behaves on it:
//!
//! ```text
//! capacity == 0   emit ──► [slot] ──► recv() ──ack──► emit returns true
//!                 (synchronous hand-off: the sender waits for the receiver)
//!
//! capacity  > 0   emit ──► [ring of `capacity`] ──► recv()
//!                 (never waits: a full channel makes emit return false)
//! ```
//!
//! Each pair carries a process-unique id so a [`PubSub`](crate::PubSub) can
//! tell its own subscriptions from foreign ones.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};

use super::event::Event;

static CHANNEL_SEQ: AtomicU64 = AtomicU64::new(1);

/// Event plus the acknowledgement a synchronous sender waits for.
struct Envelope {
    event: Event,
    ack: Option<oneshot::Sender<()>>,
}

/// Sending half of an event channel.
#[derive(Clone)]
pub struct EventSender {
    id: u64,
    capacity: usize,
    tx: mpsc::Sender<Envelope>,
}

/// Receiving half of an event channel.
///
/// Yields events in the order they were delivered and `None` once every
/// sender is gone (unsubscribed or closed).
pub struct Subscription {
    id: u64,
    capacity: usize,
    rx: mpsc::Receiver<Envelope>,
}

/// Creates an event channel with the given buffer capacity (`0` = synchronous hand-off).
pub fn channel(capacity: usize) -> (EventSender, Subscription) {
    let id = CHANNEL_SEQ.fetch_add(1, AtomicOrdering::Relaxed);
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventSender { id, capacity, tx },
        Subscription { id, capacity, rx },
    )
}

impl EventSender {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` once the receiving half has been dropped.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) async fn deliver(&self, event: Event) -> bool {
        if self.capacity == 0 {
            let (ack, acked) = oneshot::channel();
            let envelope = Envelope {
                event,
                ack: Some(ack),
            };
            if self.tx.send(envelope).await.is_err() {
                return false;
            }
            acked.await.is_ok()
        } else {
            self.tx.try_send(Envelope { event, ack: None }).is_ok()
        }
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Subscription {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Receives the next event, or `None` once the channel is closed and drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await.map(open)
    }

    /// Receives an event if one is ready.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok().map(open)
    }

    /// Turns the subscription into a [`Stream`] of events.
    pub fn into_stream(self) -> impl Stream<Item = Event> + Send + 'static {
        futures::stream::unfold(self, |mut sub| async move {
            let ev = sub.recv().await?;
            Some((ev, sub))
        })
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Releases a waiting synchronous sender and unwraps the event.
fn open(envelope: Envelope) -> Event {
    if let Some(ack) = envelope.ack {
        let _ = ack.send(());
    }
    envelope.event
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_buffered_emit_reports_full() {
        let (tx, mut rx) = channel(2);
        assert!(Event::new("k", 1).emit(&tx).await);
        assert!(Event::new("k", 2).emit(&tx).await);
        assert!(!Event::new("k", 3).emit(&tx).await);

        assert_eq!(rx.recv().await.and_then(|e| e.value), Some(1.into()));
        assert_eq!(rx.recv().await.and_then(|e| e.value), Some(2.into()));
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_synchronous_emit_waits_for_receiver() {
        let (tx, mut rx) = channel(0);
        let sender = tokio::spawn(async move { Event::new("k", "v").emit(&tx).await });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!sender.is_finished());

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.key.as_deref(), Some("k"));
        assert!(sender.await.unwrap());
    }

    #[tokio::test]
    async fn test_emit_to_dropped_receiver_fails() {
        let (tx, rx) = channel(0);
        drop(rx);
        assert!(tx.is_closed());
        assert!(!Event::new("k", "v").emit(&tx).await);

        let (tx, rx) = channel(4);
        drop(rx);
        assert!(!Event::new("k", "v").emit(&tx).await);
    }

    #[tokio::test]
    async fn test_stream_ends_when_sender_dropped() {
        let (tx, rx) = channel(8);
        for i in 0..3 {
            assert!(Event::new("n", i).emit(&tx).await);
        }
        drop(tx);
        let got: Vec<_> = rx.into_stream().collect().await;
        assert_eq!(got.len(), 3);
        assert!(got.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn test_ids_are_unique() {
        let (a, sa) = channel(1);
        let (b, _) = channel(1);
        assert_eq!(a.id(), sa.id());
        assert_ne!(a.id(), b.id());
    }
}
