//! # Run functions.
//!
//! A [`Run`] is the unit of work a [`BaseService`](crate::BaseService) wraps.
//! It receives the run-cycle's [`CancellationToken`] and a [`ReadySignal`]
//! and produces one future per cycle.
//!
//! ## Contract
//! - Do the work inside the returned future; do not hand it to a spawned worker.
//! - Call the ready signal once the service can do useful work, or with an
//!   error if it cannot start. Never calling it reports `StoppedBeforeReady`.
//! - Watch the token and return promptly once it is cancelled.
//!
//! [`RunFn`] wraps a closure `F: Fn(CancellationToken, ReadySignal) -> Fut`,
//! producing a fresh future per cycle. Shared state across restarts has to be
//! captured explicitly (e.g. `Arc<...>`).
//!
//! A [`Teardown`] hook runs once per cycle, after the run function returned.
//! Any `Fn() -> Fut` closure is one.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use servisor::{BoxError, ReadySignal, RunFn, RunRef};
//!
//! let run: RunRef = RunFn::arc(|ctx: CancellationToken, ready: ReadySignal| async move {
//!     ready.ok();
//!     ctx.cancelled().await;
//!     Ok::<_, BoxError>(())
//! });
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::BoxError;

use super::base::ReadySignal;

/// Future produced by a [`Run`] for one run-cycle.
pub type BoxRunFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'static>>;

/// Shared handle to a run function.
pub type RunRef = Arc<dyn Run>;

/// # Unit of work executed once per run-cycle.
pub trait Run: Send + Sync + 'static {
    /// Creates the future for one run-cycle.
    fn run(&self, ctx: CancellationToken, ready: ReadySignal) -> BoxRunFuture;
}

/// Shared handle to a teardown hook.
pub type TeardownRef = Arc<dyn Teardown>;

/// # Cleanup executed after each run-cycle's run function returned.
pub trait Teardown: Send + Sync + 'static {
    /// Creates the cleanup future for one cycle.
    fn teardown(&self) -> BoxRunFuture;
}

impl<F, Fut> Teardown for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn teardown(&self) -> BoxRunFuture {
        Box::pin(self())
    }
}

/// Closure-backed run function.
#[derive(Debug)]
pub struct RunFn<F> {
    f: F,
}

impl<F> RunFn<F> {
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps a closure and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

impl<F, Fut> Run for RunFn<F>
where
    F: Fn(CancellationToken, ReadySignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn run(&self, ctx: CancellationToken, ready: ReadySignal) -> BoxRunFuture {
        Box::pin((self.f)(ctx, ready))
    }
}
