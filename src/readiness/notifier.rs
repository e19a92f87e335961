//! # One-shot readiness notifier.
//!
//! [`ReadinessNotifier`] lets one run-cycle tell any number of waiters that it
//! became ready, or why it did not. It is a `watch` channel whose value moves
//! from `None` to `Some(result)` exactly once.
//!
//! ## Rules
//! - `finish` is idempotent: the first result wins, later calls are no-ops.
//! - `wait` works before, during and after `finish`; every waiter sees the same result.
//! - No reset in place: the owner replaces the notifier with a new instance, so
//!   waiters of an old cycle never see a newer cycle's outcome.

use tokio::sync::watch;

use crate::error::ReadyResult;

use super::ReadyHandle;

/// Multi-waiter completion signal carrying a [`ReadyResult`].
#[derive(Debug)]
pub struct ReadinessNotifier {
    tx: watch::Sender<Option<ReadyResult>>,
}

impl ReadinessNotifier {
    /// Creates an unresolved notifier.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Resolves the notifier and wakes all waiters.
    ///
    /// Returns `true` if this call stored the result, `false` if it was
    /// already resolved.
    pub fn finish(&self, result: ReadyResult) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(result);
            true
        })
    }

    /// Returns a handle resolving to this notifier's result.
    ///
    /// An already-resolved notifier hands out a pre-resolved handle instead of
    /// a receiver.
    pub fn wait(&self) -> ReadyHandle {
        match self.result() {
            Some(result) => ReadyHandle::resolved(result),
            None => ReadyHandle::pending(self.tx.subscribe()),
        }
    }

    /// The stored result, if any.
    pub fn result(&self) -> Option<ReadyResult> {
        self.tx.borrow().clone()
    }

    /// True once a result has been stored.
    pub fn is_finished(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

impl Default for ReadinessNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::error::ReadyError;

    #[derive(Debug, thiserror::Error)]
    #[error("random error")]
    struct RandomError;

    #[test]
    fn first_finish_wins() {
        let n = ReadinessNotifier::new();
        assert!(!n.is_finished());
        assert!(n.finish(Err(ReadyError::StoppedBeforeReady)));
        assert!(!n.finish(Ok(())));
        assert!(matches!(
            n.result(),
            Some(Err(ReadyError::StoppedBeforeReady))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn early_and_late_waiters_see_success() {
        let n = Arc::new(ReadinessNotifier::new());

        let early = n.wait();
        let fast = tokio::spawn(early.wait());

        tokio::time::sleep(Duration::from_millis(20)).await;
        n.finish(Ok(()));

        let late = n.wait();
        assert!(late.try_result().is_some());
        assert!(late.wait().await.is_ok());
        assert!(fast.await.unwrap().is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_waiter_sees_the_same_error() {
        let n = Arc::new(ReadinessNotifier::new());
        let waiters: Vec<_> = (0..16).map(|_| tokio::spawn(n.wait().wait())).collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        n.finish(Err(ReadyError::failed(Box::new(RandomError))));

        for w in waiters {
            match w.await.unwrap() {
                Err(ReadyError::Failed(e)) => assert_eq!(e.to_string(), "random error"),
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn replaced_notifier_keeps_old_waiters_consistent() {
        let old = ReadinessNotifier::new();
        let waiter = old.wait();
        old.finish(Err(ReadyError::StoppedBeforeReady));

        let fresh = ReadinessNotifier::new();
        drop(old);
        fresh.finish(Ok(()));

        assert!(matches!(
            waiter.wait().await,
            Err(ReadyError::StoppedBeforeReady)
        ));
    }
}
