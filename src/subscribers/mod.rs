//! # Event subscribers.
//!
//! ```text
//! Bus ──► listener (one task per supervisor) ──► SubscriberSet::emit
//!                                                 ├─► [queue] ─► worker ─► Subscribe::on_event
//!                                                 └─► [queue] ─► worker ─► Subscribe::on_event
//! ```
//!
//! Implement [`Subscribe`] for metrics, audit trails or alerts; enable the
//! `logging` feature for the built-in [`LogWriter`], which forwards events to `tracing`.

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
