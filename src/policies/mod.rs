//! Restart and backoff policies for supervised services.
//!
//! - [`RestartPolicy`] decides whether a child is served again after `serve` returned.
//! - [`BackoffPolicy`] decides how long to wait before the next attempt.
//! - [`JitterPolicy`] spreads those waits so siblings do not retry in lockstep.
//!
//! ```text
//! ServiceSpec { restart, backoff }
//!      └─► supervision::actor::ChildActor
//!           - restart.decide(outcome) → Restart(after) | Exit
//!           - backoff.next(failures)  → delay before the next serve
//! ```
//!
//! Defaults: `RestartPolicy::OnFailure`, constant 100ms backoff capped at 30s, no jitter.

mod backoff;
mod jitter;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::{Decision, Outcome, RestartPolicy};
