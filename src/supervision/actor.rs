//! # ChildActor: keeps one supervised service running.
//!
//! ```text
//! loop {
//!   attempt += 1; publish ServiceStarting
//!   res = serve_once(service, token)
//!   token cancelled?           → exit, res error is a teardown failure
//!   res = Err(AlreadyRunning)  → publish ServiceDead, leave
//!   restart.decide(res)
//!     Exit                     → publish ServiceExhausted, leave
//!     Restart(Some(interval))  → failures = 0
//!     Restart(None)            → backoff.next(failures), failures += 1
//!   publish BackoffScheduled; sleep (cancellable)
//! }
//! ```
//!
//! - Attempts are sequential; `attempt` never resets.
//! - The backoff exponent counts consecutive failures and resets after a clean return.
//! - Errors seen before shutdown are reported through events only, except for
//!   the last error of an escalating child that leaves supervision.

use std::sync::Arc;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::events::{BackoffSource, Bus, Event, EventKind};
use crate::policies::{Decision, Outcome};
use crate::services::ServiceSpec;

use super::runner::serve_once;

/// How a child actor ended.
pub(crate) struct ChildExit {
    pub name: Arc<str>,
    /// Error returned by the last `serve` call.
    pub error: Option<ServiceError>,
    /// Set when the child left supervision on its own and its spec escalates.
    pub escalate: bool,
}

impl ChildExit {
    fn shutdown(name: Arc<str>, error: Option<ServiceError>) -> Self {
        Self {
            name,
            error,
            escalate: false,
        }
    }
}

pub(crate) struct ChildActor {
    spec: ServiceSpec,
    bus: Bus,
}

impl ChildActor {
    /// Creates an actor that publishes its child's events on `bus`.
    pub fn new(spec: ServiceSpec, bus: Bus) -> Self {
        Self { spec, bus }
    }

    /// Serves the child until its policy gives up or `token` is cancelled.
    pub async fn run(self, token: CancellationToken) -> ChildExit {
        let service = Arc::clone(self.spec.service());
        let name: Arc<str> = Arc::from(service.name());
        let mut attempt: u32 = 0;
        let mut failures: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);
            self.bus.publish(
                Event::new(EventKind::ServiceStarting)
                    .with_service(Arc::clone(&name))
                    .with_attempt(attempt),
            );

            let res = serve_once(service.as_ref(), &token, attempt, &self.bus).await;
            if token.is_cancelled() {
                return ChildExit::shutdown(name, res.err());
            }

            let (outcome, source, error) = match res {
                Ok(()) => (Outcome::Returned, BackoffSource::Success, None),
                Err(ServiceError::AlreadyRunning) => {
                    self.bus.publish(
                        Event::new(EventKind::ServiceDead)
                            .with_service(Arc::clone(&name))
                            .with_attempt(attempt)
                            .with_reason(ServiceError::AlreadyRunning.to_string()),
                    );
                    return self.leave(name, Some(ServiceError::AlreadyRunning));
                }
                Err(e) => (Outcome::Failed, BackoffSource::Failure, Some(e)),
            };

            let delay = match self.spec.restart().decide(outcome) {
                Decision::Exit => {
                    self.bus.publish(
                        Event::new(EventKind::ServiceExhausted)
                            .with_service(Arc::clone(&name))
                            .with_attempt(attempt),
                    );
                    return self.leave(name, error);
                }
                Decision::Restart(Some(interval)) => {
                    failures = 0;
                    interval
                }
                Decision::Restart(None) => {
                    let d = self.spec.backoff().next(failures);
                    failures = failures.saturating_add(1);
                    d
                }
            };

            let mut ev = Event::new(EventKind::BackoffScheduled)
                .with_service(Arc::clone(&name))
                .with_attempt(attempt)
                .with_delay(delay)
                .with_backoff_source(source);
            if let Some(e) = &error {
                ev = ev.with_reason(e.to_string());
            }
            self.bus.publish(ev);

            tokio::select! {
                () = time::sleep(delay) => {}
                () = token.cancelled() => return ChildExit::shutdown(name, None),
            }
        }
    }

    fn leave(&self, name: Arc<str>, error: Option<ServiceError>) -> ChildExit {
        ChildExit {
            name,
            error,
            escalate: self.spec.escalates(),
        }
    }
}
