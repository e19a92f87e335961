//! Error types used by services, readiness handles and supervisors.
//!
//! This module defines three error families:
//!
//! - [`ServiceError`]: protocol misuse (`AlreadyRunning`, `NotRunning`),
//!   construction misuse (`RunFunctionRequired`) and run outcomes.
//! - [`ReadyError`]: why a readiness handle did not resolve to `Ok`.
//!   Cloneable, since one outcome is broadcast to every waiter.
//! - [`TeardownError`]: every child failure collected while a supervisor
//!   tree shuts down.
//!
//! All of them provide `as_label` for logs/metrics.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by run functions.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// # Errors produced by a service state machine.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service was built without a run function.
    #[error("run function must be specified")]
    RunFunctionRequired,

    /// `serve` was called while a run-cycle is still active.
    #[error("service already running")]
    AlreadyRunning,

    /// `stop` was called on a stopped service.
    #[error("service not running")]
    NotRunning,

    /// The run function returned this error; it is carried as-is.
    #[error(transparent)]
    Run(BoxError),

    /// The teardown hook failed after the run function returned.
    ///
    /// `run` keeps the run function's own error, if it had one.
    #[error("teardown hook failed: {error}")]
    Cleanup {
        /// Error returned by the run function, if any.
        run: Option<BoxError>,
        /// Error returned by the teardown hook.
        #[source]
        error: BoxError,
    },

    /// A supervised service panicked inside `serve`.
    #[error("service panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// One or more children failed while a supervisor tree was torn down.
    #[error(transparent)]
    Teardown(#[from] TeardownError),
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use servisor::ServiceError;
    ///
    /// assert_eq!(ServiceError::AlreadyRunning.as_label(), "service_already_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::RunFunctionRequired => "service_run_fn_required",
            ServiceError::AlreadyRunning => "service_already_running",
            ServiceError::NotRunning => "service_not_running",
            ServiceError::Run(_) => "service_run_failed",
            ServiceError::Cleanup { .. } => "service_cleanup_failed",
            ServiceError::Panicked { .. } => "service_panicked",
            ServiceError::Teardown(_) => "service_teardown_failed",
        }
    }

    /// Indicates a call-time protocol misuse (`AlreadyRunning` / `NotRunning`).
    ///
    /// Callers can usually treat these as a no-op.
    pub fn is_protocol_misuse(&self) -> bool {
        matches!(self, ServiceError::AlreadyRunning | ServiceError::NotRunning)
    }

    /// Returns the run function's error, carried by [`ServiceError::Run`] or
    /// [`ServiceError::Cleanup`].
    pub fn run_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            ServiceError::Run(e) => Some(e.as_ref()),
            ServiceError::Cleanup { run: Some(e), .. } => Some(e.as_ref()),
            _ => None,
        }
    }

    /// Joins the run function's outcome with the teardown hook's.
    pub(crate) fn from_cycle(
        run: Result<(), BoxError>,
        hook: Result<(), BoxError>,
    ) -> Result<(), Self> {
        match (run, hook) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) => Err(ServiceError::Run(e)),
            (run, Err(error)) => Err(ServiceError::Cleanup {
                run: run.err(),
                error,
            }),
        }
    }
}

/// # Why a readiness wait did not succeed.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ReadyError {
    /// The run-cycle ended before the run function reported readiness.
    #[error("stopped before ready")]
    StoppedBeforeReady,

    /// The waiter's cancellation token fired first.
    #[error("readiness wait cancelled")]
    Cancelled,

    /// The run function reported a startup failure.
    #[error("failed to become ready: {0}")]
    Failed(#[source] Arc<dyn StdError + Send + Sync + 'static>),
}

impl ReadyError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ReadyError::StoppedBeforeReady => "ready_stopped_before_ready",
            ReadyError::Cancelled => "ready_cancelled",
            ReadyError::Failed(_) => "ready_failed",
        }
    }

    pub(crate) fn failed(err: BoxError) -> Self {
        ReadyError::Failed(Arc::from(err))
    }
}

/// Result carried by readiness handles.
pub type ReadyResult = Result<(), ReadyError>;

/// One child that failed while its supervisor was shutting down.
#[derive(Debug)]
pub struct ChildFailure {
    /// Name of the child service.
    pub service: String,
    /// Error the child's last `serve` call returned.
    pub error: ServiceError,
}

/// # Aggregated teardown failures of a supervisor tree.
///
/// No child error is dropped: every failing child appears in `failures`, and
/// children still running when the grace period ran out appear in `stuck`.
#[derive(Debug, Default)]
pub struct TeardownError {
    /// Children whose final `serve` returned an error.
    pub failures: Vec<ChildFailure>,
    /// Children that had not stopped when the grace period elapsed.
    pub stuck: Vec<String>,
    /// The grace period, set only when it was exceeded.
    pub grace: Option<Duration>,
}

impl TeardownError {
    /// True when nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty() && self.stuck.is_empty()
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        if self.grace.is_some() {
            "teardown_grace_exceeded"
        } else {
            "teardown_failed"
        }
    }
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "teardown failed")?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", failure.service, failure.error)?;
        }
        if let Some(grace) = self.grace {
            write!(f, "; grace {grace:?} exceeded, stuck: {:?}", self.stuck)?;
        }
        Ok(())
    }
}

impl StdError for TeardownError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.failures
            .first()
            .map(|failure| &failure.error as &(dyn StdError + 'static))
    }
}

/// Renders a panic payload (as caught by `catch_unwind`) as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskOnFire;

    #[test]
    fn run_error_is_carried_unchanged() {
        let err = ServiceError::Run(Box::new(DiskOnFire));
        assert_eq!(err.to_string(), "disk on fire");
        assert!(
            err.run_error()
                .and_then(|e| e.downcast_ref::<DiskOnFire>())
                .is_some()
        );
        assert_eq!(err.as_label(), "service_run_failed");
    }

    #[test]
    fn hook_failure_keeps_the_run_error() {
        let err = ServiceError::from_cycle(Err(Box::new(DiskOnFire)), Err("flush failed".into()))
            .unwrap_err();
        assert_eq!(err.as_label(), "service_cleanup_failed");
        assert_eq!(err.to_string(), "teardown hook failed: flush failed");
        assert!(
            err.run_error()
                .and_then(|e| e.downcast_ref::<DiskOnFire>())
                .is_some()
        );

        let err = ServiceError::from_cycle(Err(Box::new(DiskOnFire)), Ok(())).unwrap_err();
        assert!(matches!(err, ServiceError::Run(_)));
        assert!(ServiceError::from_cycle(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn protocol_misuse_is_recoverable() {
        assert!(ServiceError::AlreadyRunning.is_protocol_misuse());
        assert!(ServiceError::NotRunning.is_protocol_misuse());
        assert!(!ServiceError::RunFunctionRequired.is_protocol_misuse());
    }

    #[test]
    fn teardown_joins_every_failure() {
        let err = TeardownError {
            failures: vec![
                ChildFailure {
                    service: "db".into(),
                    error: ServiceError::Run(Box::new(DiskOnFire)),
                },
                ChildFailure {
                    service: "http".into(),
                    error: ServiceError::Panicked {
                        message: "boom".into(),
                    },
                },
            ],
            stuck: vec!["cache".into()],
            grace: Some(Duration::from_secs(1)),
        };
        let text = err.to_string();
        assert!(text.contains("db: disk on fire"));
        assert!(text.contains("http: service panicked: boom"));
        assert!(text.contains("stuck: [\"cache\"]"));
        assert_eq!(err.as_label(), "teardown_grace_exceeded");
        assert!(err.source().is_some());
    }

    #[test]
    fn panic_payloads_become_messages() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(s.as_ref()), "unknown panic");
    }
}
