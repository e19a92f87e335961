//! # servisor
//!
//! **Servisor** is a lifecycle controller for restartable async services.
//!
//! A service is driven through `serve → ready → stop` cycles by a
//! [`BaseService`] state machine. Any number of waiters learn when a cycle
//! became ready (or why it never did), `stop` is idempotent, and a stopped
//! service can be served again with no state leaking between cycles.
//! Services are grouped under a [`Supervisor`], which is itself a service, so
//! trees nest.
//!
//! ## Architecture
//! ```text
//!   Run (user code) ◄── ctx, ReadySignal ───┐
//!                                           │
//! ┌─────────────────────────────────────────┴─────────────────────────┐
//! │ BaseService                                                       │
//! │  lock ─ status: Stopped → Running → Ready → Stopping → Stopped     │
//! │       ─ scope (child CancellationToken)                           │
//! │       ─ ReadinessNotifier (one per cycle, replaced at cycle end)  │
//! │       ─ stopped-handle  (closed once at cycle end)                │
//! └──────┬──────────────────────────────────────┬─────────────────────┘
//!        │ ready() → ReadyHandle                │ stop() → StoppedHandle
//!        ▼                                      ▼
//!   all_ready(ctx, [a, b, c])             StoppedHandle::wait()
//!
//! Supervisor (a Service around a BaseService)
//!   ├─► ChildActor per ServiceSpec: serve, restart per RestartPolicy/BackoffPolicy
//!   ├─► Bus (broadcast Events) ─► SubscriberSet ─► Subscribe impls
//!   └─► teardown within grace ─► TeardownError (every child error kept)
//! ```
//!
//! ## Features
//! | Area            | Description                                          | Key types                                    |
//! |-----------------|------------------------------------------------------|----------------------------------------------|
//! | **Services**    | Restartable state machine around a run function.     | [`BaseService`], [`Run`], [`RunFn`], [`Service`] |
//! | **Readiness**   | One-shot broadcast of a cycle's readiness.           | [`ReadinessNotifier`], [`ReadyHandle`], [`all_ready`] |
//! | **Supervision** | Child restarts, dynamic children, graceful teardown. | [`Supervisor`], [`ServiceSpec`]              |
//! | **Policies**    | Restart and backoff strategies.                      | [`RestartPolicy`], [`BackoffPolicy`]         |
//! | **Events**      | Lifecycle events for logging and metrics.            | [`Event`], [`Subscribe`]                     |
//! | **Errors**      | Typed errors with stable labels.                     | [`ServiceError`], [`ReadyError`], [`TeardownError`] |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber writing events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use servisor::{BaseService, BoxError, ReadySignal, Status};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let svc = Arc::new(
//!         BaseService::builder("echo")
//!             .with_run_fn(|ctx: CancellationToken, ready: ReadySignal| async move {
//!                 ready.ok();
//!                 ctx.cancelled().await;
//!                 Ok::<_, BoxError>(())
//!             })
//!             .build()?,
//!     );
//!
//!     let (ready, join) = servisor::start(Arc::clone(&svc), CancellationToken::new());
//!     ready.wait().await?;
//!     assert_eq!(svc.status(), Status::Ready);
//!
//!     svc.stop()?.wait().await;
//!     assert_eq!(svc.status(), Status::Stopped);
//!     join.await??;
//!
//!     // Nothing is serving now; a fresh wait belongs to the next cycle.
//!     assert!(svc.ready().try_result().is_none());
//!     Ok(())
//! }
//! ```
mod error;
mod events;
mod policies;
mod readiness;
mod services;
mod subscribers;
mod supervision;

// ---- Public re-exports ----

pub use error::{BoxError, ChildFailure, ReadyError, ReadyResult, ServiceError, TeardownError};
pub use events::{BackoffSource, Bus, Event, EventKind};
pub use policies::{BackoffPolicy, Decision, JitterPolicy, Outcome, RestartPolicy};
pub use readiness::{AllReady, ReadinessNotifier, ReadyHandle, all_ready};
pub use services::{
    BaseService, BaseServiceBuilder, BoxRunFuture, ReadySignal, Run, RunFn, RunRef, Service,
    ServiceRef, ServiceSpec, Status, StoppedHandle, Teardown, TeardownRef, start,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use supervision::{Supervisor, SupervisorBuilder, SupervisorConfig};

// Optional: `tracing` bridge for events.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
