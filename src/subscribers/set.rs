//! # Fan-out to subscribers.
//!
//! - `emit` never waits: it `try_send`s into every subscriber queue.
//! - Each subscriber sees events in order; there is no order across subscribers.
//! - A full or closed queue drops the event for that subscriber and publishes
//!   `SubscriberOverflow` (never for an overflow event itself).
//! - A panicking `on_event` is caught and reported as `SubscriberPanicked`;
//!   the worker moves on to the next event.
//! - Subscriber events are never handed back to the subscriber they are about,
//!   and a panic while handling one is only logged, so a misbehaving subscriber
//!   cannot feed itself (or another one) through the bus.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};

use super::Subscribe;

struct Queue {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Per-subscriber queues and worker tasks.
pub struct SubscriberSet {
    queues: Vec<Queue>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut queues = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let bus = bus.clone();

            workers.push(tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let handled = AssertUnwindSafe(sub.on_event(&ev)).catch_unwind().await;
                    let Err(payload) = handled else { continue };
                    let message = panic_message(&*payload);
                    if ev.is_internal() {
                        error!(
                            subscriber = name,
                            kind = ev.kind.as_label(),
                            %message,
                            "subscriber panicked on a subscriber event"
                        );
                    } else {
                        bus.publish(Event::subscriber_panicked(name, message));
                    }
                }
            }));
            queues.push(Queue { name, tx });
        }

        Self {
            queues,
            workers,
            bus,
        }
    }

    /// Hands `event` to every subscriber queue.
    pub fn emit(&self, event: Event) {
        let report = event.kind != EventKind::SubscriberOverflow;
        let event = Arc::new(event);

        for q in &self.queues {
            if event.is_internal() && event.service.as_deref() == Some(q.name) {
                continue;
            }
            let reason = match q.tx.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if report {
                self.bus.publish(Event::subscriber_overflow(q.name, reason));
            }
        }
    }

    /// Closes all queues and waits for the workers to drain them.
    pub async fn shutdown(self) {
        drop(self.queues);
        for w in self.workers {
            let _ = w.await;
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// True when no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct Count(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Count {
        async fn on_event(&self, _ev: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "count"
        }
    }

    struct Explode;

    #[async_trait]
    impl Subscribe for Explode {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber exploded");
        }
        fn name(&self) -> &'static str {
            "explode"
        }
    }

    #[tokio::test]
    async fn panicking_subscriber_does_not_starve_others() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let seen = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(
            vec![Arc::new(Explode), Arc::new(Count(Arc::clone(&seen)))],
            bus.clone(),
        );
        assert_eq!(set.len(), 2);

        set.emit(Event::new(EventKind::ServiceStarting));
        set.emit(Event::new(EventKind::ServiceStopped));
        set.shutdown().await;

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.service.as_deref(), Some("explode"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber exploded"));
    }

    struct Twin(&'static str, Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Twin {
        async fn on_event(&self, _ev: &Event) {
            self.1.fetch_add(1, Ordering::SeqCst);
            panic!("{} exploded", self.0);
        }
        fn name(&self) -> &'static str {
            self.0
        }
    }

    #[tokio::test]
    async fn panic_reports_do_not_bounce_between_subscribers() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let calls = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(
            vec![
                Arc::new(Twin("left", Arc::clone(&calls))),
                Arc::new(Twin("right", Arc::clone(&calls))),
            ],
            bus.clone(),
        );

        set.emit(Event::new(EventKind::ServiceStarting));
        // Feed the panic reports back the way a supervisor listener would.
        let mut reported = Vec::new();
        for _ in 0..2 {
            let ev = rx.recv().await.unwrap();
            assert_eq!(ev.kind, EventKind::SubscriberPanicked);
            reported.push(ev.service.clone());
            set.emit(ev);
        }
        set.shutdown().await;

        // One call each for the real event, one each for the other's report.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(rx.try_recv().is_err());
        reported.sort();
        assert_eq!(reported, vec![Some("left".into()), Some("right".into())]);
    }
}
