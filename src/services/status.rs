//! # Service status.
//!
//! ```text
//!                     serve()
//!   Stopped ───────────────────────► Running
//!      ▲                              │   │ ready(Ok)
//!      │ run fn returned              │   ▼
//!      │                              │  Ready
//!      │     stop() / cancellation /  │   │
//!      │     ready(Err)               ▼   ▼
//!      └─────────────────────────── Stopping
//! ```
//!
//! The numeric values are stable and may be persisted or logged.

use std::fmt;

/// Lifecycle status of a service.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// Not started, or the last run-cycle finished.
    #[default]
    Stopped = 0,
    /// Run function is executing but has not reported readiness.
    Running = 1,
    /// Run function reported readiness.
    Ready = 2,
    /// Cancellation requested; waiting for the run function to return.
    Stopping = 3,
}

impl Status {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            Status::Stopped => "stopped",
            Status::Running => "running",
            Status::Ready => "ready",
            Status::Stopping => "stopping",
        }
    }

    /// True for every status except [`Status::Stopped`].
    pub fn is_active(self) -> bool {
        !matches!(self, Status::Stopped)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl From<Status> for u8 {
    fn from(s: Status) -> u8 {
        s as u8
    }
}

impl TryFrom<u8> for Status {
    type Error = u8;

    /// Fails with the offending value when it names no status.
    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Status::Stopped),
            1 => Ok(Status::Running),
            2 => Ok(Status::Ready),
            3 => Ok(Status::Stopping),
            other => Err(other),
        }
    }
}
