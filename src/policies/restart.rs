//! # Restart policy.
//!
//! ```text
//! Never                       serve once, whatever the outcome
//! OnFailure                   serve again after an error or panic (default)
//! Always { interval: None }   serve again right away, with failures still backed off
//! Always { interval: Some }   periodic: wait `interval` after a clean return
//! ```

use std::time::Duration;

/// How a single `serve` call ended, as seen by the restart policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// `serve` returned `Ok(())`.
    Returned,
    /// `serve` returned an error or panicked.
    Failed,
}

/// Decision taken by [`RestartPolicy::decide`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Serve again. `None` means "use the backoff policy".
    Restart(Option<Duration>),
    /// Leave the child stopped for good.
    Exit,
}

/// Whether a supervised service is served again after `serve` returned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Serve exactly once.
    Never,
    /// Serve again only after a failure.
    #[default]
    OnFailure,
    /// Serve again after every return.
    Always {
        /// Pause after a clean return; `None` restarts immediately.
        interval: Option<Duration>,
    },
}

impl RestartPolicy {
    /// Maps an outcome to a restart decision.
    ///
    /// Failures always defer the delay to the backoff policy.
    pub fn decide(&self, outcome: Outcome) -> Decision {
        match (self, outcome) {
            (RestartPolicy::Never, _) => Decision::Exit,
            (RestartPolicy::OnFailure, Outcome::Returned) => Decision::Exit,
            (_, Outcome::Failed) => Decision::Restart(None),
            (RestartPolicy::Always { interval }, Outcome::Returned) => {
                Decision::Restart(Some(interval.unwrap_or(Duration::ZERO)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exits_on_both_outcomes() {
        assert_eq!(RestartPolicy::Never.decide(Outcome::Returned), Decision::Exit);
        assert_eq!(RestartPolicy::Never.decide(Outcome::Failed), Decision::Exit);
    }

    #[test]
    fn on_failure_only_restarts_failures() {
        let p = RestartPolicy::default();
        assert_eq!(p.decide(Outcome::Returned), Decision::Exit);
        assert_eq!(p.decide(Outcome::Failed), Decision::Restart(None));
    }

    #[test]
    fn always_uses_interval_after_clean_return() {
        let p = RestartPolicy::Always {
            interval: Some(Duration::from_secs(5)),
        };
        assert_eq!(
            p.decide(Outcome::Returned),
            Decision::Restart(Some(Duration::from_secs(5)))
        );
        assert_eq!(p.decide(Outcome::Failed), Decision::Restart(None));

        let eager = RestartPolicy::Always { interval: None };
        assert_eq!(
            eager.decide(Outcome::Returned),
            Decision::Restart(Some(Duration::ZERO))
        );
    }
}
