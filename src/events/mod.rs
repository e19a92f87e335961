//! Supervision events: data model and broadcast bus.
//!
//! - [`EventKind`], [`Event`]: what happened, to which service, with which details.
//! - [`Bus`]: thin wrapper over `tokio::sync::broadcast`.
//!
//! Publishers are the supervisor loop, child actors, `runner::serve_once` and
//! the subscriber workers (overflow/panic). The only consumer inside the crate
//! is the supervisor's listener, which fans out to the [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{BackoffSource, Event, EventKind};
