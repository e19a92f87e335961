//! # Supervisor: a service that keeps a set of child services running.
//!
//! A [`Supervisor`] is a [`Service`] whose run function spawns one
//! [`ChildActor`] per registered [`ServiceSpec`], reports ready, and on
//! cancellation tears the children down within [`SupervisorConfig::grace`].
//! Because it is a `Service`, supervisors nest.
//!
//! ```text
//! serve(ctx) ──► BaseService cycle ──► supervise(scope, ready)
//!   spawn listener: Bus ─► SubscriberSet                (only with subscribers)
//!   spawn ChildActor per spec                           (JoinSet)
//!   ready.ok(); publish SupervisorStarted
//!   loop select {
//!     scope cancelled     → break
//!     add(spec) received  → spawn ChildActor, publish ServiceAdded
//!     child actor exited  → (policy exhausted / dead)
//!       └─ escalating child → publish ServiceEscalated, cancel scope
//!   }
//!   publish ShutdownRequested
//!   timeout(grace, join all):
//!     ├─ joined → AllStoppedWithin
//!     └─ elapsed → GraceExceeded, stuck = actors still running, then aborted
//!   escalation cause + errors of interrupted children → TeardownError (none dropped)
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use servisor::{BaseService, BoxError, ReadySignal, Service, ServiceSpec, Status, Supervisor};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ticker = BaseService::builder("ticker")
//!         .with_run_fn(|ctx: CancellationToken, ready: ReadySignal| async move {
//!             ready.ok();
//!             ctx.cancelled().await;
//!             Ok::<_, BoxError>(())
//!         })
//!         .build()?;
//!
//!     let sup = Supervisor::builder("root")
//!         .with_service(ServiceSpec::from(Arc::new(ticker)))
//!         .build();
//!
//!     let ctx = CancellationToken::new();
//!     let join = sup.serve_in_background(ctx.clone()).await;
//!     assert_eq!(sup.status(), Status::Ready);
//!
//!     ctx.cancel();
//!     join.await??;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{self, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{BoxError, ChildFailure, ServiceError, TeardownError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::readiness::ReadyHandle;
use crate::services::{
    BaseService, ReadySignal, RunFn, Service, ServiceRef, ServiceSpec, Status, StoppedHandle,
    start,
};
use crate::subscribers::SubscriberSet;

use super::actor::{ChildActor, ChildExit};
use super::builder::SupervisorBuilder;
use super::config::SupervisorConfig;

/// Service supervising a dynamic set of child services.
pub struct Supervisor {
    base: BaseService,
    inner: Arc<Inner>,
}

pub(super) struct Inner {
    pub(super) name: Arc<str>,
    pub(super) cfg: SupervisorConfig,
    pub(super) bus: Bus,
    pub(super) subs: Option<Arc<SubscriberSet>>,
    pub(super) children: Mutex<Children>,
}

#[derive(Default)]
pub(super) struct Children {
    pub(super) specs: Vec<ServiceSpec>,
    /// Present while a supervise loop is accepting new children.
    pub(super) live: Option<mpsc::UnboundedSender<ServiceSpec>>,
}

impl Supervisor {
    /// Starts a builder with default configuration.
    pub fn builder(name: impl Into<Arc<str>>) -> SupervisorBuilder {
        SupervisorBuilder::new(name)
    }

    pub(super) fn from_inner(inner: Arc<Inner>) -> Self {
        let run = {
            let inner = Arc::clone(&inner);
            RunFn::arc(move |ctx: CancellationToken, ready: ReadySignal| {
                let inner = Arc::clone(&inner);
                async move { inner.supervise(ctx, ready).await }
            })
        };
        Self {
            base: BaseService::new(Arc::clone(&inner.name), run),
            inner,
        }
    }

    /// Supervisor name.
    pub fn name(&self) -> &str {
        self.base.name()
    }

    /// Configuration the supervisor was built with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.cfg
    }

    /// Serves the whole tree in the calling task.
    ///
    /// Child errors collected during teardown come back as
    /// [`ServiceError::Teardown`].
    pub async fn serve(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
        match self.base.serve(ctx).await {
            Err(ServiceError::Run(err)) => match err.downcast::<TeardownError>() {
                Ok(teardown) => Err(ServiceError::Teardown(*teardown)),
                Err(err) => Err(ServiceError::Run(err)),
            },
            other => other,
        }
    }

    /// Spawns [`serve`](Self::serve) and returns once the supervisor is ready.
    ///
    /// By then every registered child has been spawned and [`add`](Self::add)
    /// starts new children immediately. If the cycle ends before becoming
    /// ready, the handle is returned anyway and yields the outcome.
    pub async fn serve_in_background(
        self: &Arc<Self>,
        ctx: CancellationToken,
    ) -> JoinHandle<Result<(), ServiceError>> {
        let (ready, join) = start(Arc::clone(self), ctx);
        if let Err(e) = ready.wait().await {
            debug!(supervisor = %self.inner.name, error = %e, "supervisor not ready");
        }
        join
    }

    /// Status of the supervisor's own cycle.
    pub fn status(&self) -> Status {
        self.base.status()
    }

    /// Resolves once the children are spawned and `add` starts new ones.
    pub fn ready(&self) -> ReadyHandle {
        self.base.ready()
    }

    /// Stops the whole tree; the handle closes after teardown.
    pub fn stop(&self) -> Result<StoppedHandle, ServiceError> {
        self.base.stop()
    }

    /// Handle closing when the current cycle ends, without stopping it.
    pub fn stopped(&self) -> Option<StoppedHandle> {
        self.base.stopped()
    }

    /// Registers a child.
    ///
    /// While the supervisor is running the child starts right away; it is also
    /// started on every later supervisor cycle.
    pub fn add(&self, spec: impl Into<ServiceSpec>) {
        let spec = spec.into();
        let mut children = self.inner.children.lock();
        if let Some(live) = &children.live {
            let _ = live.send(spec.clone());
        }
        children.specs.push(spec);
    }

    /// Snapshot of the registered children, in registration order.
    pub fn children(&self) -> Vec<ServiceRef> {
        self.inner
            .children
            .lock()
            .specs
            .iter()
            .map(|spec| Arc::clone(spec.service()))
            .collect()
    }

    /// Receiver for this supervisor's events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }
}

#[async_trait]
impl Service for Supervisor {
    fn name(&self) -> &str {
        Supervisor::name(self)
    }

    async fn serve(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
        Supervisor::serve(self, ctx).await
    }

    fn status(&self) -> Status {
        Supervisor::status(self)
    }

    fn ready(&self) -> ReadyHandle {
        Supervisor::ready(self)
    }

    fn stop(&self) -> Result<StoppedHandle, ServiceError> {
        Supervisor::stop(self)
    }

    fn stopped(&self) -> Option<StoppedHandle> {
        Supervisor::stopped(self)
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("name", &self.inner.name)
            .field("status", &self.status())
            .field("children", &self.inner.children.lock().specs.len())
            .finish()
    }
}

impl Inner {
    async fn supervise(&self, ctx: CancellationToken, ready: ReadySignal) -> Result<(), BoxError> {
        let listener = self.spawn_listener();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let initial = {
            let mut children = self.children.lock();
            children.live = Some(tx);
            children.specs.clone()
        };

        let mut actors = Actors::default();
        let count = initial.len();
        for spec in initial {
            self.spawn_child(&mut actors, &ctx, spec);
        }

        ready.ok();
        self.bus.publish(
            Event::new(EventKind::SupervisorStarted)
                .with_service(Arc::clone(&self.name))
                .with_attempt(u32::try_from(count).unwrap_or(u32::MAX)),
        );
        debug!(supervisor = %self.name, children = count, "supervisor started");

        let mut escalated = Vec::new();
        loop {
            tokio::select! {
                () = ctx.cancelled() => break,
                Some(spec) = rx.recv() => {
                    self.bus.publish(
                        Event::new(EventKind::ServiceAdded).with_service(spec.name()),
                    );
                    self.spawn_child(&mut actors, &ctx, spec);
                }
                Some(exit) = actors.join_next(), if !actors.is_empty() => {
                    let Some(exit) = exit else { continue };
                    debug!(supervisor = %self.name, child = %exit.name, "child left supervision");
                    if exit.escalate {
                        self.bus.publish(
                            Event::new(EventKind::ServiceEscalated)
                                .with_service(Arc::clone(&exit.name))
                                .with_reason(Arc::clone(&self.name)),
                        );
                        warn!(
                            supervisor = %self.name,
                            child = %exit.name,
                            "escalating child left supervision, stopping"
                        );
                        if let Some(error) = exit.error {
                            escalated.push(ChildFailure {
                                service: exit.name.to_string(),
                                error,
                            });
                        }
                        ctx.cancel();
                    }
                }
            }
        }

        self.children.lock().live = None;
        drop(rx);
        self.bus.publish(
            Event::new(EventKind::ShutdownRequested).with_service(Arc::clone(&self.name)),
        );

        let mut report = self.teardown(actors).await;
        escalated.append(&mut report.failures);
        report.failures = escalated;

        if let Some((stop, handle)) = listener {
            stop.cancel();
            let _ = handle.await;
        }

        if report.is_empty() {
            debug!(supervisor = %self.name, "supervisor stopped");
            Ok(())
        } else {
            warn!(supervisor = %self.name, error = %report, "supervisor teardown failed");
            Err(Box::new(report))
        }
    }

    fn spawn_child(&self, actors: &mut Actors, ctx: &CancellationToken, spec: ServiceSpec) {
        let name: Arc<str> = Arc::from(spec.name());
        let actor = ChildActor::new(spec, self.bus.clone());
        let token = ctx.child_token();

        let task = {
            let name = Arc::clone(&name);
            actors.set.spawn(async move {
                match AssertUnwindSafe(actor.run(token)).catch_unwind().await {
                    Ok(exit) => exit,
                    Err(payload) => ChildExit {
                        name,
                        error: Some(ServiceError::Panicked {
                            message: panic_message(&*payload),
                        }),
                        escalate: false,
                    },
                }
            })
        };
        actors.names.insert(task.id(), name);
    }

    async fn teardown(&self, mut actors: Actors) -> TeardownError {
        let grace = self.cfg.grace;
        let mut report = TeardownError::default();

        let drained = tokio::time::timeout(grace, async {
            while let Some(exit) = actors.join_next().await {
                if let Some(ChildExit {
                    name,
                    error: Some(error),
                    ..
                }) = exit
                {
                    report.failures.push(ChildFailure {
                        service: name.to_string(),
                        error,
                    });
                }
            }
        })
        .await;

        match drained {
            Ok(()) => {
                self.bus.publish(
                    Event::new(EventKind::AllStoppedWithin).with_service(Arc::clone(&self.name)),
                );
            }
            Err(_elapsed) => {
                let mut stuck: Vec<String> =
                    actors.names.values().map(|name| name.to_string()).collect();
                stuck.sort_unstable();
                report.stuck = stuck;
                report.grace = Some(grace);
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded)
                        .with_service(Arc::clone(&self.name))
                        .with_reason(report.stuck.join(", ")),
                );
                actors.set.abort_all();
            }
        }
        report
    }

    /// Forwards bus events to the subscribers until stopped, then drains what is left.
    fn spawn_listener(&self) -> Option<(CancellationToken, JoinHandle<()>)> {
        let subs = Arc::clone(self.subs.as_ref()?);
        let mut rx = self.bus.subscribe();
        let stop = CancellationToken::new();
        let name = Arc::clone(&self.name);

        let handle = tokio::spawn({
            let stop = stop.clone();
            async move {
                loop {
                    tokio::select! {
                        biased;
                        got = rx.recv() => match got {
                            Ok(ev) => subs.emit(ev),
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!(supervisor = %name, skipped = n, "event listener lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => return,
                        },
                        () = stop.cancelled() => break,
                    }
                }
                loop {
                    match rx.try_recv() {
                        Ok(ev) => subs.emit(ev),
                        Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                        Err(_) => return,
                    }
                }
            }
        });
        Some((stop, handle))
    }
}

/// Child actors of one supervisor cycle, with the name of each running actor.
#[derive(Default)]
struct Actors {
    set: JoinSet<ChildExit>,
    names: HashMap<task::Id, Arc<str>>,
}

impl Actors {
    fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Next finished actor; `Some(None)` when it was cancelled or aborted.
    async fn join_next(&mut self) -> Option<Option<ChildExit>> {
        let joined = self.set.join_next_with_id().await?;
        Some(match joined {
            Ok((id, exit)) => {
                self.names.remove(&id);
                Some(exit)
            }
            Err(e) => {
                let name = self.names.remove(&e.id());
                warn!(child = ?name, error = %e, "child actor did not finish");
                None
            }
        })
    }
}
