//! # Readiness signalling.
//!
//! - [`ReadinessNotifier`] one-shot, multi-waiter completion signal for one run-cycle
//! - [`ReadyHandle`] what `ready()` hands out; resolves exactly once
//! - [`all_ready`] waits for a sequence of services, failing fast
//!
//! ```text
//!   run fn ── ready(result) ──► ReadinessNotifier::finish ──► watch value = Some(result)
//!                                                                  │
//!                          ┌───────────────────┬───────────────────┤
//!                          ▼                   ▼                   ▼
//!                   ReadyHandle::wait   ReadyHandle::wait   ReadyHandle::wait
//!                   (before finish)     (during)            (after: pre-resolved)
//! ```

mod all_ready;
mod handle;
mod notifier;

pub use all_ready::{AllReady, all_ready};
pub use handle::ReadyHandle;
pub use notifier::ReadinessNotifier;
