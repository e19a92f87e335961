//! # Supervisor configuration.
//!
//! [`SupervisorConfig`] is used in two places:
//! 1. building a supervisor: `Supervisor::builder(name).with_config(cfg)`
//! 2. child defaults: `ServiceSpec::with_defaults(service, &cfg)`

use std::time::Duration;

use crate::policies::{BackoffPolicy, RestartPolicy};

/// Settings shared by a supervisor and the children it adds with defaults.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// How long teardown waits for children after cancellation.
    ///
    /// Children still running afterwards are reported as stuck in the
    /// [`TeardownError`](crate::TeardownError).
    pub grace: Duration,

    /// Ring size of the event bus. Lagging receivers skip older events.
    pub bus_capacity: usize,

    /// Default restart policy for [`crate::ServiceSpec::with_defaults`].
    pub restart: RestartPolicy,

    /// Default backoff policy for [`crate::ServiceSpec::with_defaults`].
    pub backoff: BackoffPolicy,
}

impl SupervisorConfig {
    /// Bus capacity clamped to at least 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Replaces the grace period.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

impl Default for SupervisorConfig {
    /// 60s grace, 1024 bus slots, `OnFailure` restarts, default backoff.
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_clamped() {
        let cfg = SupervisorConfig {
            bus_capacity: 0,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(
            SupervisorConfig::default()
                .with_grace(Duration::from_secs(1))
                .grace,
            Duration::from_secs(1)
        );
    }
}
