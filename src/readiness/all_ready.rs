//! # Readiness of a group of services.
//!
//! [`all_ready`] snapshots each service's [`ReadyHandle`] when called and
//! returns a future that resolves once all of them resolved `Ok`, or with the
//! first error met in order. The waiter's token is raced against every step.
//!
//! ```text
//! all_ready(ctx, [a, b, c])
//!   handles = [a.ready(), b.ready(), c.ready()]    (taken now)
//!   for h in handles:
//!       select { ctx.cancelled() → Err(Cancelled),
//!                h.wait()        → Err(e) → return Err(e) }
//!   Ok(())
//! ```
//!
//! The future owns everything it waits on; nothing is spawned, and dropping
//! it abandons the wait.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::{ReadyError, ReadyResult};
use crate::services::Service;

use super::ReadyHandle;

/// Waits for every service to become ready, in order.
///
/// An error from service `i` resolves the future immediately, without
/// waiting on services after `i`. An empty input resolves `Ok(())`.
pub fn all_ready<I>(ctx: &CancellationToken, services: I) -> AllReady
where
    I: IntoIterator,
    I::Item: AsRef<dyn Service>,
{
    let handles: Vec<ReadyHandle> = services
        .into_iter()
        .map(|svc| svc.as_ref().ready())
        .collect();
    let ctx = ctx.clone();

    AllReady {
        fut: Box::pin(async move {
            for handle in handles {
                tokio::select! {
                    biased;
                    () = ctx.cancelled() => return Err(ReadyError::Cancelled),
                    res = handle.wait() => res?,
                }
            }
            Ok(())
        }),
    }
}

/// Future returned by [`all_ready`]. Owns its handles; `'static` and `Send`.
#[must_use = "futures do nothing unless awaited"]
pub struct AllReady {
    fut: BoxFuture<'static, ReadyResult>,
}

impl Future for AllReady {
    type Output = ReadyResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<ReadyResult> {
        self.fut.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for AllReady {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllReady").finish_non_exhaustive()
    }
}
