//! # Event bus.
//!
//! ```text
//!   ChildActor ──┐
//!   runner     ──┼──► Bus (broadcast) ──► listener ──► SubscriberSet
//!   Supervisor ──┘                    └─► Supervisor::subscribe() receivers
//! ```
//!
//! - `publish` never blocks; with no receivers the event is dropped.
//! - Capacity is one shared ring; slow receivers observe `Lagged(n)` and skip ahead.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for [`Event`]s. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus holding at most `capacity` (min 1) undelivered events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fire-and-forget publish.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// New receiver observing events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_see_events_in_publish_order() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::SupervisorStarted));
        bus.publish(Event::new(EventKind::ShutdownRequested));

        let a = rx.recv().await.unwrap();
        let b = rx.recv().await.unwrap();
        assert_eq!(a.kind, EventKind::SupervisorStarted);
        assert_eq!(b.kind, EventKind::ShutdownRequested);
        assert!(a.seq < b.seq);
    }

    #[tokio::test]
    async fn lagging_receiver_skips_oldest() {
        let bus = Bus::new(2);
        let mut rx = bus.subscribe();
        for _ in 0..5 {
            bus.publish(Event::new(EventKind::ServiceStarting));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert!(rx.recv().await.is_ok());
    }

    #[test]
    fn publish_without_receivers_is_a_noop() {
        let bus = Bus::new(0);
        assert_eq!(bus.receiver_count(), 0);
        bus.publish(Event::new(EventKind::GraceExceeded));
    }
}
