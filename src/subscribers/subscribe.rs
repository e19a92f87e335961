//! # Subscriber contract.
//!
//! Each subscriber gets its own bounded queue and worker task inside the
//! [`SubscriberSet`](super::SubscriberSet). A slow subscriber only drops its
//! own events; it never slows the children or other subscribers.
//!
//! ```rust
//! use async_trait::async_trait;
//! use servisor::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter(std::sync::atomic::AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ServiceFailed {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Handler for supervision events.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Runs on the subscriber's own worker task.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue; events beyond it are dropped.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
