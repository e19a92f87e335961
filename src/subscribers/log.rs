//! # `tracing` bridge for supervision events.
//!
//! [`LogWriter`] turns each [`Event`] into a `tracing` record under the
//! `servisor::events` target. Failures and grace overruns log at `WARN`,
//! subscriber trouble at `ERROR`, everything else at `INFO`/`DEBUG`.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber writing events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let kind = e.kind.as_label();

        match e.kind {
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
                error!(target: "servisor::events", seq = e.seq, kind, subscriber = service, reason);
            }
            EventKind::ServiceFailed | EventKind::ServiceNotReady | EventKind::ServiceDead => {
                warn!(
                    target: "servisor::events",
                    seq = e.seq,
                    kind,
                    service,
                    attempt = e.attempt,
                    reason,
                );
            }
            EventKind::GraceExceeded => {
                warn!(
                    target: "servisor::events",
                    seq = e.seq,
                    kind,
                    supervisor = service,
                    stuck = reason,
                );
            }
            EventKind::ServiceEscalated => {
                warn!(target: "servisor::events", seq = e.seq, kind, service, supervisor = reason);
            }
            EventKind::BackoffScheduled => {
                debug!(
                    target: "servisor::events",
                    seq = e.seq,
                    kind,
                    service,
                    attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    source = ?e.backoff_source,
                    reason,
                );
            }
            EventKind::ServiceStarting | EventKind::ServiceStopped => {
                debug!(target: "servisor::events", seq = e.seq, kind, service, attempt = e.attempt);
            }
            _ => {
                info!(target: "servisor::events", seq = e.seq, kind, service, attempt = e.attempt);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
