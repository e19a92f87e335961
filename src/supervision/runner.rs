//! # One supervised `serve` call.
//!
//! ```text
//! handle = service.ready()                 (taken before serve starts)
//! select (biased) {
//!   serve(token) (panics caught)  → outcome
//!   handle.wait()                 → ServiceReady | ServiceNotReady   (once)
//! }
//! readiness not seen yet and already known → ServiceReady | ServiceNotReady
//! outcome → ServiceStopped (Ok) | ServiceFailed (Err or panic)
//! ```
//!
//! Exactly one terminal event (`ServiceStopped` or `ServiceFailed`) per call.
//! A call rejected with `AlreadyRunning` never ran, so it reports no readiness:
//! the handle belongs to whoever else is serving the service.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::{ReadyResult, ServiceError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::services::Service;

/// Serves `service` once, turning a panic into [`ServiceError::Panicked`].
pub(crate) async fn serve_once(
    service: &dyn Service,
    token: &CancellationToken,
    attempt: u32,
    bus: &Bus,
) -> Result<(), ServiceError> {
    let name = service.name();
    let ready = service.ready().wait();
    let serve = AssertUnwindSafe(service.serve(token.clone())).catch_unwind();
    tokio::pin!(ready, serve);

    let mut ready_seen = false;
    let outcome = loop {
        tokio::select! {
            biased;
            out = &mut serve => break out,
            r = &mut ready, if !ready_seen => {
                ready_seen = true;
                publish_ready(bus, name, attempt, r);
            }
        }
    };
    let rejected = matches!(outcome, Ok(Err(ServiceError::AlreadyRunning)));
    if !ready_seen && !rejected {
        if let Some(r) = ready.as_mut().now_or_never() {
            publish_ready(bus, name, attempt, r);
        }
    }

    let res = outcome.unwrap_or_else(|payload| {
        Err(ServiceError::Panicked {
            message: panic_message(&*payload),
        })
    });
    match &res {
        Ok(()) => bus.publish(
            Event::new(EventKind::ServiceStopped)
                .with_service(name)
                .with_attempt(attempt),
        ),
        Err(e) => bus.publish(
            Event::new(EventKind::ServiceFailed)
                .with_service(name)
                .with_attempt(attempt)
                .with_reason(e.to_string()),
        ),
    }
    res
}

fn publish_ready(bus: &Bus, name: &str, attempt: u32, r: ReadyResult) {
    let ev = match r {
        Ok(()) => Event::new(EventKind::ServiceReady),
        Err(e) => Event::new(EventKind::ServiceNotReady).with_reason(e.to_string()),
    };
    bus.publish(ev.with_service(name).with_attempt(attempt));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::BoxError;
    use crate::services::{BaseService, ReadySignal, Status};

    fn kinds(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    #[tokio::test]
    async fn clean_cycle_reports_ready_then_stopped() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let svc = BaseService::builder("ok")
            .with_run_fn(|_ctx: CancellationToken, ready: ReadySignal| async move {
                ready.ok();
                tokio::task::yield_now().await;
                Ok::<_, BoxError>(())
            })
            .build()
            .unwrap();

        serve_once(&svc, &CancellationToken::new(), 1, &bus).await.unwrap();
        assert_eq!(
            kinds(&mut rx),
            vec![EventKind::ServiceReady, EventKind::ServiceStopped]
        );
    }

    #[tokio::test]
    async fn panic_becomes_an_error_and_resets_status() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let svc = BaseService::builder("boom")
            .with_run_fn(|ctx: CancellationToken, _ready: ReadySignal| async move {
                if !ctx.is_cancelled() {
                    panic!("kaboom");
                }
                Ok::<_, BoxError>(())
            })
            .build()
            .unwrap();

        let err = serve_once(&svc, &CancellationToken::new(), 2, &bus)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Panicked { ref message } if message == "kaboom"));
        assert_eq!(svc.status(), Status::Stopped);
        assert_eq!(
            kinds(&mut rx),
            vec![EventKind::ServiceNotReady, EventKind::ServiceFailed]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rejected_call_reports_no_readiness() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let svc = Arc::new(
            BaseService::builder("owned")
                .with_run_fn(|ctx: CancellationToken, ready: ReadySignal| async move {
                    ready.ok();
                    ctx.cancelled().await;
                    Ok::<_, BoxError>(())
                })
                .build()
                .unwrap(),
        );
        let owner = CancellationToken::new();
        let (ready, join) = crate::services::start(Arc::clone(&svc), owner.clone());
        ready.wait().await.unwrap();

        let err = serve_once(svc.as_ref(), &CancellationToken::new(), 1, &bus)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyRunning));
        assert_eq!(kinds(&mut rx), vec![EventKind::ServiceFailed]);

        owner.cancel();
        join.await.unwrap().unwrap();
    }
}
