//! Reconnection delays.

use std::time::Duration;

/// Exponential backoff settings for reopening the serial channel.
///
/// The first retry waits `initial`; each further failure multiplies the
/// delay by `multiplier`, capped at `max`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(10),
            multiplier: 2,
        }
    }
}

/// Stateful delay sequence derived from a [`ReconnectPolicy`].
///
/// # Examples
///
/// ```
/// use parkgate_link::{Backoff, ReconnectPolicy};
/// use std::time::Duration;
///
/// let mut backoff = Backoff::new(ReconnectPolicy {
///     initial: Duration::from_millis(100),
///     max: Duration::from_millis(300),
///     multiplier: 2,
/// });
///
/// assert_eq!(backoff.next_delay(), Duration::from_millis(100));
/// assert_eq!(backoff.next_delay(), Duration::from_millis(200));
/// assert_eq!(backoff.next_delay(), Duration::from_millis(300));
/// backoff.reset();
/// assert_eq!(backoff.next_delay(), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    next: Duration,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        let next = policy.initial.min(policy.max);
        Self { policy, next }
    }

    /// Delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = delay
            .checked_mul(self.policy.multiplier.max(1))
            .unwrap_or(self.policy.max)
            .min(self.policy.max);
        delay
    }

    /// Start over from the initial delay, after a successful connection.
    pub fn reset(&mut self) {
        self.next = self.policy.initial.min(self.policy.max);
    }
}
