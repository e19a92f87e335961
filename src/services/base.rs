//! # BaseService: the service state machine.
//!
//! [`BaseService`] wraps a [`Run`](crate::Run) with a restartable
//! serve → ready → stop protocol. Concrete services hold a `BaseService` and
//! forward the [`Service`] methods to it.
//!
//! ## Run-cycle
//! ```text
//! serve(ctx)
//!   ├─► lock: Stopped? else AlreadyRunning
//!   │         status = Running, cycle += 1
//!   │         scope = ctx.child_token(), fresh stopped-handle
//!   ├─► run.run(scope, ready_signal)   (awaited in the caller's task)
//!   │     ├─ ready.ok()          → Ready, notifier = Ok
//!   │     ├─ ready.fail(e)       → Stopping, notifier = Failed(e), scope cancelled
//!   │     └─ scope cancelled     → Running|Ready → Stopping
//!   ├─► run returned, with wait_for services or a teardown hook:
//!   │     status = Stopping
//!   │     wait until every wait_for service is stopped
//!   │     teardown hook (its error is joined with the run result)
//!   └─► cycle over / unwound / dropped (CycleGuard):
//!         lock: notifier ← StoppedBeforeReady (if unresolved)
//!               fresh notifier for the next cycle
//!               status = Stopped
//!               stopped-handle closed
//! ```
//!
//! ## Rules
//! - Status, scope, stopped-handle and notifier live behind one lock.
//! - The stopped-handle closes after the run function returned and after
//!   status went back to `Stopped`.
//! - A [`ReadySignal`] only acts on the cycle it was created for.
//! - Run errors are returned unchanged inside [`ServiceError::Run`]; a failing
//!   teardown hook turns the outcome into [`ServiceError::Cleanup`].
//! - The teardown hook does not run when the `serve` future is dropped.
//! - Two services waiting for each other never finish stopping.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{BoxError, ReadyError, ServiceError};
use crate::readiness::{ReadinessNotifier, ReadyHandle};

use super::run_fn::{RunFn, RunRef, TeardownRef};
use super::service::{Service, ServiceRef};
use super::status::Status;

/// Restartable service state machine around a [`Run`](crate::Run).
pub struct BaseService {
    shared: Arc<Shared>,
    run: RunRef,
    teardown: Option<TeardownRef>,
    /// Services that must be stopped before this one finishes stopping.
    waits: Vec<ServiceRef>,
}

struct Shared {
    name: Arc<str>,
    state: Mutex<State>,
}

struct State {
    status: Status,
    /// Identifies the current (or last) run-cycle.
    cycle: u64,
    scope: Option<CancellationToken>,
    /// Dropped exactly once, at the end of the cycle.
    stopped: Option<watch::Sender<()>>,
    notifier: Arc<ReadinessNotifier>,
}

impl BaseService {
    /// Creates a service around `run`.
    pub fn new(name: impl Into<Arc<str>>, run: RunRef) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                state: Mutex::new(State {
                    status: Status::Stopped,
                    cycle: 0,
                    scope: None,
                    stopped: None,
                    notifier: Arc::new(ReadinessNotifier::new()),
                }),
            }),
            run,
            teardown: None,
            waits: Vec::new(),
        }
    }

    /// Starts a builder; [`BaseServiceBuilder::build`] fails without a run function.
    pub fn builder(name: impl Into<Cow<'static, str>>) -> BaseServiceBuilder {
        BaseServiceBuilder::new(name)
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Runs one cycle; returns once the run function returned and the cycle
    /// was wound down.
    ///
    /// Fails immediately with [`ServiceError::AlreadyRunning`] if a cycle is active.
    /// Dropping the returned future ends the cycle as if the run function returned.
    pub async fn serve(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
        let (cycle, scope, signal) = self.shared.begin(&ctx)?;
        let guard = CycleGuard {
            shared: &self.shared,
            cycle,
        };
        debug!(service = %self.shared.name, cycle, "service started running");

        let mut run = self.run.run(scope.clone(), signal);
        let res = tokio::select! {
            biased;
            res = &mut run => res,
            () = scope.cancelled() => {
                self.shared.mark_stopping(cycle);
                run.await
            }
        };

        let hook = self.wind_down(cycle).await;
        drop(guard);
        let ok = res.is_ok() && hook.is_ok();
        debug!(service = %self.shared.name, cycle, ok, "service stopped");
        ServiceError::from_cycle(res, hook)
    }

    async fn wind_down(&self, cycle: u64) -> Result<(), BoxError> {
        if self.waits.is_empty() && self.teardown.is_none() {
            return Ok(());
        }
        self.shared.mark_stopping(cycle);

        for dep in &self.waits {
            if let Some(stopped) = dep.stopped() {
                debug!(
                    service = %self.shared.name,
                    cycle,
                    waits_for = dep.name(),
                    "waiting for dependency to stop"
                );
                stopped.wait().await;
            }
        }
        match &self.teardown {
            Some(hook) => hook.teardown().await,
            None => Ok(()),
        }
    }

    /// Snapshot of the current status.
    pub fn status(&self) -> Status {
        self.shared.state.lock().status
    }

    /// Handle resolving once the current cycle is ready or failed to start.
    ///
    /// Between cycles the handle belongs to the next cycle.
    pub fn ready(&self) -> ReadyHandle {
        let st = self.shared.state.lock();
        if st.status == Status::Ready {
            return ReadyHandle::ready();
        }
        st.notifier.wait()
    }

    /// Handle closing when the current cycle ends, without requesting a stop.
    ///
    /// `None` while stopped.
    pub fn stopped(&self) -> Option<StoppedHandle> {
        let st = self.shared.state.lock();
        st.stopped.as_ref().map(|tx| StoppedHandle { rx: tx.subscribe() })
    }

    /// Requests the current cycle to stop.
    ///
    /// Returns a handle that closes once the run function returned. Calling
    /// it again while stopping returns the same handle without cancelling twice.
    pub fn stop(&self) -> Result<StoppedHandle, ServiceError> {
        let mut st = self.shared.state.lock();
        match st.status {
            Status::Stopped => return Err(ServiceError::NotRunning),
            Status::Stopping => {}
            Status::Running | Status::Ready => {
                st.status = Status::Stopping;
                if let Some(scope) = &st.scope {
                    scope.cancel();
                }
                debug!(service = %self.shared.name, cycle = st.cycle, "service stop requested");
            }
        }
        st.stopped
            .as_ref()
            .map(|tx| StoppedHandle { rx: tx.subscribe() })
            .ok_or(ServiceError::NotRunning)
    }
}

impl fmt::Debug for BaseService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseService")
            .field("name", &self.shared.name)
            .field("status", &self.status())
            .finish()
    }
}

#[async_trait]
impl Service for BaseService {
    fn name(&self) -> &str {
        BaseService::name(self)
    }

    async fn serve(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
        BaseService::serve(self, ctx).await
    }

    fn status(&self) -> Status {
        BaseService::status(self)
    }

    fn ready(&self) -> ReadyHandle {
        BaseService::ready(self)
    }

    fn stop(&self) -> Result<StoppedHandle, ServiceError> {
        BaseService::stop(self)
    }

    fn stopped(&self) -> Option<StoppedHandle> {
        BaseService::stopped(self)
    }
}

impl Shared {
    fn begin(
        self: &Arc<Self>,
        ctx: &CancellationToken,
    ) -> Result<(u64, CancellationToken, ReadySignal), ServiceError> {
        let mut st = self.state.lock();
        if st.status != Status::Stopped {
            return Err(ServiceError::AlreadyRunning);
        }
        st.status = Status::Running;
        st.cycle = st.cycle.wrapping_add(1);

        let (stopped, _rx) = watch::channel(());
        st.stopped = Some(stopped);

        let scope = ctx.child_token();
        st.scope = Some(scope.clone());

        let signal = ReadySignal {
            shared: Arc::downgrade(self),
            notifier: Arc::clone(&st.notifier),
            cycle: st.cycle,
        };
        Ok((st.cycle, scope, signal))
    }

    /// Cancellation observed: Running|Ready → Stopping.
    fn mark_stopping(&self, cycle: u64) {
        let mut st = self.state.lock();
        if st.cycle == cycle && matches!(st.status, Status::Running | Status::Ready) {
            st.status = Status::Stopping;
        }
    }

    fn on_ready(&self, cycle: u64, result: Result<(), BoxError>) {
        let mut st = self.state.lock();
        if st.cycle != cycle || st.status != Status::Running {
            return;
        }
        match result {
            Ok(()) => {
                st.notifier.finish(Ok(()));
                st.status = Status::Ready;
                debug!(service = %self.name, cycle, "service ready");
            }
            Err(err) => {
                debug!(service = %self.name, cycle, error = %err, "service failed to become ready");
                st.notifier.finish(Err(ReadyError::failed(err)));
                st.status = Status::Stopping;
                if let Some(scope) = &st.scope {
                    scope.cancel();
                }
            }
        }
    }

    fn end_cycle(&self, cycle: u64) {
        let mut st = self.state.lock();
        if st.cycle != cycle || st.status == Status::Stopped {
            return;
        }
        st.notifier.finish(Err(ReadyError::StoppedBeforeReady));
        st.notifier = Arc::new(ReadinessNotifier::new());
        st.status = Status::Stopped;
        if let Some(scope) = st.scope.take() {
            scope.cancel();
        }
        drop(st.stopped.take());
    }
}

/// Ends the cycle on return, unwind, or drop of the `serve` future.
struct CycleGuard<'a> {
    shared: &'a Shared,
    cycle: u64,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.shared.end_cycle(self.cycle);
    }
}

/// The `ready` callback handed to a run function.
///
/// Cheap to clone. Only the first call of the cycle it belongs to has an
/// effect; calls from a finished cycle are ignored.
#[derive(Clone)]
pub struct ReadySignal {
    shared: Weak<Shared>,
    notifier: Arc<ReadinessNotifier>,
    cycle: u64,
}

impl ReadySignal {
    /// Reports readiness (`Ok`) or a startup failure (`Err`).
    ///
    /// A failure ends the cycle: waiters get [`ReadyError::Failed`] and the
    /// run function's token is cancelled.
    pub fn ready(&self, result: Result<(), BoxError>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_ready(self.cycle, result);
        }
    }

    /// Shorthand for `ready(Ok(()))`.
    pub fn ok(&self) {
        self.ready(Ok(()));
    }

    /// Shorthand for `ready(Err(err))`.
    pub fn fail(&self, err: impl Into<BoxError>) {
        self.ready(Err(err.into()));
    }

    /// True once this signal's cycle has a readiness result.
    pub fn is_resolved(&self) -> bool {
        self.notifier.is_finished()
    }
}

impl fmt::Debug for ReadySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadySignal")
            .field("cycle", &self.cycle)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Handle closing once a run-cycle has fully stopped.
#[derive(Debug, Clone)]
pub struct StoppedHandle {
    rx: watch::Receiver<()>,
}

impl StoppedHandle {
    /// Waits until the cycle's run function returned and status is `Stopped`.
    pub async fn wait(mut self) {
        while self.rx.changed().await.is_ok() {}
    }

    /// True once the cycle has stopped.
    pub fn is_stopped(&self) -> bool {
        self.rx.has_changed().is_err()
    }

    /// True if both handles belong to the same run-cycle.
    pub fn same_cycle(&self, other: &StoppedHandle) -> bool {
        self.rx.same_channel(&other.rx)
    }
}

/// Builder for [`BaseService`].
pub struct BaseServiceBuilder {
    name: Cow<'static, str>,
    run: Option<RunRef>,
    teardown: Option<TeardownRef>,
    waits: Vec<ServiceRef>,
}

impl BaseServiceBuilder {
    /// Creates a builder with the given service name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            run: None,
            teardown: None,
            waits: Vec::new(),
        }
    }

    /// Sets the run function.
    pub fn with_run(mut self, run: RunRef) -> Self {
        self.run = Some(run);
        self
    }

    /// Sets the run function from a closure.
    pub fn with_run_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn(CancellationToken, ReadySignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.with_run(RunFn::arc(f))
    }

    /// Sets the hook run after each cycle's run function returned.
    ///
    /// Its error is reported by `serve` as [`ServiceError::Cleanup`].
    pub fn with_teardown(mut self, hook: TeardownRef) -> Self {
        self.teardown = Some(hook);
        self
    }

    /// Sets the teardown hook from a closure.
    pub fn with_teardown_fn<F, Fut>(self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.with_teardown(Arc::new(f))
    }

    /// Makes every cycle wait for `other` to be stopped before it finishes stopping.
    ///
    /// `other` is not stopped by this service; it only has to be stopped by
    /// its own owner.
    pub fn with_wait_for(mut self, other: ServiceRef) -> Self {
        self.waits.push(other);
        self
    }

    /// Builds the service.
    ///
    /// Fails with [`ServiceError::RunFunctionRequired`] if no run function was set.
    pub fn build(self) -> Result<BaseService, ServiceError> {
        let run = self.run.ok_or(ServiceError::RunFunctionRequired)?;
        Ok(BaseService {
            teardown: self.teardown,
            waits: self.waits,
            ..BaseService::new(self.name.into_owned(), run)
        })
    }
}
