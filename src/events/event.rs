//! # Supervision events.
//!
//! Every event gets a process-wide, monotonically increasing `seq`; use it to
//! restore order when events from different children interleave.
//!
//! ```rust
//! use std::time::Duration;
//! use servisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_service("http")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_millis(400))
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.service.as_deref(), Some("http"));
//! assert_eq!(ev.delay_ms, Some(400));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervision events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Subscribers ===
    /// A subscriber panicked while handling an event.
    ///
    /// Sets: `service` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// A subscriber queue dropped an event.
    ///
    /// Sets: `service` (subscriber name), `reason` ("full" or "closed").
    SubscriberOverflow,

    // === Supervisor ===
    /// Supervisor spawned its children and reported ready.
    ///
    /// Sets: `service` (supervisor name), `attempt` (number of children).
    SupervisorStarted,

    /// Supervisor context was cancelled; children are being stopped.
    ///
    /// Sets: `service` (supervisor name).
    ShutdownRequested,

    /// All children stopped within the grace period.
    ///
    /// Sets: `service` (supervisor name).
    AllStoppedWithin,

    /// Grace period ran out with children still running.
    ///
    /// Sets: `service` (supervisor name), `reason` (stuck children).
    GraceExceeded,

    /// A child was added to a running supervisor.
    ///
    /// Sets: `service` (child name).
    ServiceAdded,

    // === Children ===
    /// A child is about to be served.
    ///
    /// Sets: `service`, `attempt` (1-based, never resets).
    ServiceStarting,

    /// A child reported readiness for this attempt.
    ///
    /// Sets: `service`, `attempt`.
    ServiceReady,

    /// A child's attempt ended without becoming ready.
    ///
    /// Sets: `service`, `attempt`, `reason`.
    ServiceNotReady,

    /// A child's `serve` returned `Ok(())`.
    ///
    /// Sets: `service`, `attempt`.
    ServiceStopped,

    /// A child's `serve` returned an error or panicked.
    ///
    /// Sets: `service`, `attempt`, `reason`.
    ServiceFailed,

    /// Next attempt scheduled.
    ///
    /// Sets: `service`, `attempt` (previous attempt), `delay_ms`,
    /// `backoff_source`, `reason` (only after a failure).
    BackoffScheduled,

    /// The restart policy allows no further attempt.
    ///
    /// Sets: `service`, `attempt`.
    ServiceExhausted,

    /// The child cannot be served at all (it is already running elsewhere).
    ///
    /// Sets: `service`, `attempt`, `reason`.
    ServiceDead,

    /// An escalating child left supervision; its supervisor is stopping.
    ///
    /// Sets: `service` (child name), `reason` (supervisor name).
    ServiceEscalated,
}

impl EventKind {
    /// Short stable label (snake_case) for logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::SubscriberPanicked => "subscriber_panicked",
            EventKind::SubscriberOverflow => "subscriber_overflow",
            EventKind::SupervisorStarted => "supervisor_started",
            EventKind::ShutdownRequested => "shutdown_requested",
            EventKind::AllStoppedWithin => "all_stopped_within",
            EventKind::GraceExceeded => "grace_exceeded",
            EventKind::ServiceAdded => "service_added",
            EventKind::ServiceStarting => "service_starting",
            EventKind::ServiceReady => "service_ready",
            EventKind::ServiceNotReady => "service_not_ready",
            EventKind::ServiceStopped => "service_stopped",
            EventKind::ServiceFailed => "service_failed",
            EventKind::BackoffScheduled => "backoff_scheduled",
            EventKind::ServiceExhausted => "service_exhausted",
            EventKind::ServiceDead => "service_dead",
            EventKind::ServiceEscalated => "service_escalated",
        }
    }
}

/// Why a restart was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffSource {
    /// Periodic restart after a clean return.
    Success,
    /// Retry after an error or panic.
    Failure,
}

/// Supervision event with optional metadata, set depending on [`EventKind`].
#[derive(Debug, Clone)]
pub struct Event {
    /// Process-wide monotonic sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Service (or subscriber) the event is about.
    pub service: Option<Arc<str>>,
    /// Human-readable detail: error, panic message, overflow reason.
    pub reason: Option<Arc<str>>,
    /// Attempt number (1-based).
    pub attempt: Option<u32>,
    /// Restart delay in milliseconds, saturated at `u32::MAX`.
    pub delay_ms: Option<u32>,
    /// Set on [`EventKind::BackoffScheduled`].
    pub backoff_source: Option<BackoffSource>,
}

impl Event {
    /// Creates an event stamped with the current time and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            reason: None,
            attempt: None,
            delay_ms: None,
            backoff_source: None,
        }
    }

    /// Names the service the event is about.
    #[inline]
    pub fn with_service(mut self, name: impl Into<Arc<str>>) -> Self {
        self.service = Some(name.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the attempt number (or a count, see [`EventKind`]).
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay, stored as saturated milliseconds.
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(u32::try_from(d.as_millis()).unwrap_or(u32::MAX));
        self
    }

    /// Records whether a restart delay follows a failure or a success.
    #[inline]
    pub fn with_backoff_source(mut self, source: BackoffSource) -> Self {
        self.backoff_source = Some(source);
        self
    }

    /// Subscriber queue overflow.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(reason)
    }

    /// Subscriber panic.
    pub fn subscriber_panicked(subscriber: &'static str, message: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(message)
    }

    /// True for events emitted by the subscriber machinery itself.
    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
