//! # Service contract.
//!
//! [`Service`] is what supervisors, [`all_ready`](crate::all_ready) and
//! [`start`] operate on. [`BaseService`](crate::BaseService) implements it;
//! richer services hold a `BaseService` and forward to it:
//!
//! ```rust
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use servisor::{
//!     BaseService, BoxError, ReadyHandle, ReadySignal, Service, ServiceError, Status,
//!     StoppedHandle,
//! };
//!
//! struct Cache {
//!     base: BaseService,
//! }
//!
//! impl Cache {
//!     fn new() -> Result<Self, ServiceError> {
//!         let base = BaseService::builder("cache")
//!             .with_run_fn(|ctx: CancellationToken, ready: ReadySignal| async move {
//!                 ready.ok();
//!                 ctx.cancelled().await;
//!                 Ok::<_, BoxError>(())
//!             })
//!             .build()?;
//!         Ok(Self { base })
//!     }
//! }
//!
//! #[async_trait]
//! impl Service for Cache {
//!     fn name(&self) -> &str { self.base.name() }
//!     async fn serve(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
//!         self.base.serve(ctx).await
//!     }
//!     fn status(&self) -> Status { self.base.status() }
//!     fn ready(&self) -> ReadyHandle { self.base.ready() }
//!     fn stop(&self) -> Result<StoppedHandle, ServiceError> { self.base.stop() }
//!     fn stopped(&self) -> Option<StoppedHandle> { self.base.stopped() }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::readiness::ReadyHandle;

use super::base::StoppedHandle;
use super::status::Status;

/// A restartable service with a serve/ready/stop lifecycle.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Stable name used in events and errors.
    fn name(&self) -> &str;

    /// Runs one cycle in the calling task; returns when it is over.
    async fn serve(&self, ctx: CancellationToken) -> Result<(), ServiceError>;

    /// Current status.
    fn status(&self) -> Status;

    /// Readiness of the current (or next) cycle.
    fn ready(&self) -> ReadyHandle;

    /// Requests the current cycle to stop.
    fn stop(&self) -> Result<StoppedHandle, ServiceError>;

    /// Handle closing when the current cycle ends, without stopping it.
    ///
    /// `None` while stopped.
    fn stopped(&self) -> Option<StoppedHandle>;
}

/// Shared handle to a service.
pub type ServiceRef = Arc<dyn Service>;

/// Serves `service` on a new task.
///
/// The readiness handle is taken before the task is spawned, so it refers to
/// the cycle this call starts (or to the running one, if `serve` then fails
/// with [`ServiceError::AlreadyRunning`]).
pub fn start<S>(
    service: Arc<S>,
    ctx: CancellationToken,
) -> (ReadyHandle, JoinHandle<Result<(), ServiceError>>)
where
    S: Service + ?Sized,
{
    let ready = service.ready();
    let join = tokio::spawn(async move { service.serve(ctx).await });
    (ready, join)
}
