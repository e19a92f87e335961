//! # Jitter for backoff delays.
//!
//! Randomizes restart delays so children failing together do not retry together.
//!
//! ```text
//! None          d
//! Full          rand[0, d]
//! Equal         d/2 + rand[0, d/2]
//! Decorrelated  rand[first, min(3·d, max)]
//! ```

use std::time::Duration;

use rand::Rng;

/// Randomization applied to a computed backoff delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Exact delays.
    #[default]
    None,
    /// Anywhere between zero and the delay.
    Full,
    /// Upper half of the delay.
    Equal,
    /// Between the first delay and three times the current one, capped.
    Decorrelated,
}

impl JitterPolicy {
    /// Jitters `delay`.
    ///
    /// `floor` and `cap` only matter for [`JitterPolicy::Decorrelated`].
    pub fn apply(&self, delay: Duration, floor: Duration, cap: Duration) -> Duration {
        let ms = millis(delay);
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_millis(pick(0, ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + pick(0, half))
            }
            JitterPolicy::Decorrelated => {
                let lo = millis(floor.min(cap));
                let hi = ms.saturating_mul(3).min(millis(cap)).max(lo);
                Duration::from_millis(pick(lo, hi))
            }
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn pick(lo: u64, hi: u64) -> u64 {
    if lo >= hi {
        return lo;
    }
    rand::rng().random_range(lo..=hi)
}
