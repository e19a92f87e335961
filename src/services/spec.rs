//! # Child specification.
//!
//! A [`ServiceSpec`] pairs a service with the restart and backoff policies its
//! supervisor applies. [`ServiceSpec::with_defaults`] takes both from the
//! supervisor's [`SupervisorConfig`].
//!
//! An escalating child takes its supervisor down with it: once the child
//! leaves supervision (restart policy exhausted, or found running elsewhere)
//! the supervisor stops all other children and ends its own cycle.

use std::sync::Arc;

use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::supervision::SupervisorConfig;

use super::service::{Service, ServiceRef};

/// Supervised child: service plus policies.
#[derive(Clone)]
pub struct ServiceSpec {
    service: ServiceRef,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
    escalate: bool,
}

impl ServiceSpec {
    /// Spec with explicit policies; does not escalate.
    pub fn new(service: ServiceRef, restart: RestartPolicy, backoff: BackoffPolicy) -> Self {
        Self {
            service,
            restart,
            backoff,
            escalate: false,
        }
    }

    /// Spec using the config's default policies.
    pub fn with_defaults(service: ServiceRef, cfg: &SupervisorConfig) -> Self {
        Self::new(service, cfg.restart, cfg.backoff)
    }

    /// The supervised service.
    pub fn service(&self) -> &ServiceRef {
        &self.service
    }

    /// The service's name.
    pub fn name(&self) -> &str {
        self.service.name()
    }

    /// Restart policy applied after each `serve`.
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    /// Backoff policy applied between failed attempts.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// True if the supervisor stops once this child leaves supervision.
    pub fn escalates(&self) -> bool {
        self.escalate
    }

    /// Replaces the restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Replaces the backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Stops the supervisor when this child leaves supervision.
    pub fn with_escalation(mut self, escalate: bool) -> Self {
        self.escalate = escalate;
        self
    }
}

impl<S: Service> From<Arc<S>> for ServiceSpec {
    /// Spec with default policies.
    fn from(service: Arc<S>) -> Self {
        Self::new(service, RestartPolicy::default(), BackoffPolicy::default())
    }
}

impl std::fmt::Debug for ServiceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSpec")
            .field("service", &self.service.name())
            .field("restart", &self.restart)
            .field("backoff", &self.backoff)
            .field("escalate", &self.escalate)
            .finish()
    }
}
