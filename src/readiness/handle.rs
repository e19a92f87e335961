//! # Readiness wait handle.
//!
//! A [`ReadyHandle`] is either already resolved (fast path, no channel
//! involved) or a receiver on a cycle's [`ReadinessNotifier`](super::ReadinessNotifier).
//! It never spawns a task: abandoning a handle just drops the receiver.

use tokio::sync::watch;

use crate::error::{ReadyError, ReadyResult};

/// Handle yielding the readiness result of one run-cycle exactly once.
#[derive(Debug)]
pub struct ReadyHandle {
    state: HandleState,
}

#[derive(Debug)]
enum HandleState {
    Resolved(ReadyResult),
    Pending(watch::Receiver<Option<ReadyResult>>),
}

impl ReadyHandle {
    /// A handle already resolved to `Ok(())`.
    ///
    /// Built on demand; there is no shared "always ready" instance.
    pub fn ready() -> Self {
        Self::resolved(Ok(()))
    }

    /// A handle already resolved to `result`.
    pub fn resolved(result: ReadyResult) -> Self {
        Self {
            state: HandleState::Resolved(result),
        }
    }

    pub(crate) fn pending(rx: watch::Receiver<Option<ReadyResult>>) -> Self {
        Self {
            state: HandleState::Pending(rx),
        }
    }

    /// Returns the result if it is already known, without waiting.
    pub fn try_result(&self) -> Option<ReadyResult> {
        match &self.state {
            HandleState::Resolved(r) => Some(r.clone()),
            HandleState::Pending(rx) => rx.borrow().clone(),
        }
    }

    /// Waits for the result.
    ///
    /// A notifier dropped without ever being resolved reads as
    /// [`ReadyError::StoppedBeforeReady`].
    pub async fn wait(self) -> ReadyResult {
        match self.state {
            HandleState::Resolved(r) => r,
            HandleState::Pending(mut rx) => {
                let seen = rx
                    .wait_for(Option::is_some)
                    .await
                    .map(|slot| (*slot).clone());
                match seen {
                    Ok(Some(r)) => r,
                    Ok(None) | Err(_) => Err(ReadyError::StoppedBeforeReady),
                }
            }
        }
    }
}
