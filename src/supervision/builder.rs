use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::Bus;
use crate::services::ServiceSpec;
use crate::subscribers::{Subscribe, SubscriberSet};

use super::config::SupervisorConfig;
use super::supervisor::{Children, Inner, Supervisor};

/// Builder for [`Supervisor`].
pub struct SupervisorBuilder {
    name: Arc<str>,
    cfg: SupervisorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    specs: Vec<ServiceSpec>,
}

impl SupervisorBuilder {
    /// Starts a builder with default configuration and no children.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            cfg: SupervisorConfig::default(),
            subscribers: Vec::new(),
            specs: Vec::new(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: SupervisorConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers.
    ///
    /// Each one gets a dedicated worker fed by a bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Registers a child.
    pub fn with_service(mut self, spec: impl Into<ServiceSpec>) -> Self {
        self.specs.push(spec.into());
        self
    }

    /// Builds the supervisor.
    ///
    /// With subscribers configured this spawns their workers, so it must run
    /// inside a Tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = (!self.subscribers.is_empty())
            .then(|| Arc::new(SubscriberSet::new(self.subscribers, bus.clone())));

        let inner = Arc::new(Inner {
            name: self.name,
            cfg: self.cfg,
            bus,
            subs,
            children: Mutex::new(Children {
                specs: self.specs,
                live: None,
            }),
        });
        Arc::new(Supervisor::from_inner(inner))
    }
}
