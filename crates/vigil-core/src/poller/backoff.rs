//! Backoff policy: decides how long to wait between polls.

use std::time::Duration;

/// Delay schedule for the polling loop.
///
/// Defaults keep the service's documented behaviour: exponential growth with
/// no ceiling and no attempt budget. Both limits are opt-in.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first poll, and the base of the exponential schedule.
    pub base_delay: Duration,

    /// Growth factor per attempt.
    pub multiplier: f64,

    /// Optional ceiling for a single delay.
    pub max_delay: Option<Duration>,

    /// Optional number of polls after which the loop gives up.
    pub max_attempts: Option<u32>,
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay,
            multiplier: 2.0,
            max_delay: None,
            max_attempts: None,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Delay between submission and the first poll.
    pub fn initial_delay(&self) -> Duration {
        self.cap(self.base_delay)
    }

    /// Delay after the `attempt`-th unfinished poll (1-indexed).
    ///
    /// delay = base_delay * multiplier^attempt
    ///
    /// Example with base_delay=1s, multiplier=2.0:
    /// - attempt 1: 2s
    /// - attempt 2: 4s
    /// - attempt 3: 8s
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        // saturate instead of panicking once the schedule outgrows Duration
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
        self.cap(delay)
    }

    /// May another poll be issued after `polls_made` polls?
    pub fn allows(&self, polls_made: u32) -> bool {
        self.max_attempts.is_none_or(|max| polls_made < max)
    }

    fn cap(&self, delay: Duration) -> Duration {
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_policy_is_unbounded() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.multiplier, 2.0);
        assert_eq!(policy.max_delay, None);
        assert!(policy.allows(u32::MAX - 1));
    }

    #[rstest]
    #[case::first(1, 2_000)]
    #[case::second(2, 4_000)]
    #[case::third(3, 8_000)]
    #[case::tenth(10, 1_024_000)]
    fn delay_is_base_times_two_to_the_attempt(#[case] attempt: u32, #[case] expected_ms: u64) {
        let policy = BackoffPolicy::new(Duration::from_secs(1));
        assert_eq!(policy.next_delay(attempt), Duration::from_millis(expected_ms));
    }

    #[test]
    fn delays_strictly_increase() {
        let policy = BackoffPolicy::new(Duration::from_millis(250));
        let delays: Vec<_> = (1..=12).map(|n| policy.next_delay(n)).collect();
        assert!(delays.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn initial_delay_is_base() {
        let policy = BackoffPolicy::new(Duration::from_millis(300));
        assert_eq!(policy.initial_delay(), Duration::from_millis(300));
    }

    #[test]
    fn ceiling_caps_delays() {
        let policy =
            BackoffPolicy::new(Duration::from_secs(1)).with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.next_delay(2), Duration::from_secs(4));
        assert_eq!(policy.next_delay(3), Duration::from_secs(5));
        assert_eq!(policy.next_delay(30), Duration::from_secs(5));
    }

    #[test]
    fn huge_attempts_saturate_instead_of_panicking() {
        let policy = BackoffPolicy::new(Duration::from_secs(1));
        assert_eq!(policy.next_delay(10_000), Duration::MAX);
    }

    #[test]
    fn attempt_budget() {
        let policy = BackoffPolicy::default().with_max_attempts(3);
        assert!(policy.allows(0));
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
    }
}
