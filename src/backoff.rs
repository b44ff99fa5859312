//! Bounded exponential backoff for the Execute engine (spec §4.3, module D).

use std::time::Duration;

/// An iterator-like bounded exponential backoff: each call to
/// [`ExponentialBackoff::next_backoff`] either returns the next sleep
/// duration or `None` once the total elapsed budget is exhausted.
///
/// Grounded in the same shape as a retry config's `backoff_for_attempt`,
/// but tracks elapsed wall-clock directly against a total timeout rather
/// than a fixed attempt count, since the engine's budget is time-bounded.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    timeout: Duration,
    attempt: u32,
    elapsed: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, multiplier: f64, timeout: Duration) -> Self {
        Self { initial, max, multiplier, timeout, attempt: 0, elapsed: Duration::ZERO }
    }

    /// The engine's default: 250ms initial, 2.0x multiplier, 8s cap, total
    /// budget of 10 minutes.
    pub fn default_for_timeout(timeout: Duration) -> Self {
        Self::new(Duration::from_millis(250), Duration::from_secs(8), 2.0, timeout)
    }

    fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(secs.min(self.max.as_secs_f64()))
    }

    /// Advance to the next backoff, or `None` if doing so would exceed the
    /// total timeout budget.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        let backoff = self.backoff_for_attempt(self.attempt);
        if self.elapsed + backoff > self.timeout {
            return None;
        }
        self.attempt += 1;
        self.elapsed += backoff;
        Some(backoff)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Tracks consecutive-failure counts to derive a node's unhealthy penalty
/// (spec §4.2): `min(1s * 2^consecutive_failures, 1 hour)`, reset on the
/// first success.
pub(crate) fn health_penalty(consecutive_failures: u32) -> Duration {
    let secs = 2f64.powi(consecutive_failures as i32);
    Duration::from_secs_f64(secs.min(3600.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(250), Duration::from_secs(8), 2.0, Duration::from_secs(60));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(250)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(500)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn backoff_caps_at_max() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(4), 2.0, Duration::from_secs(600));
        for _ in 0..10 {
            backoff.next_backoff();
        }
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(4)));
    }

    #[test]
    fn backoff_exhausts_when_budget_consumed() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(10), Duration::from_secs(10), 2.0, Duration::from_secs(15));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(10)));
        assert_eq!(backoff.next_backoff(), None);
    }

    #[test]
    fn health_penalty_doubles_and_caps_at_one_hour() {
        assert_eq!(health_penalty(0), Duration::from_secs(1));
        assert_eq!(health_penalty(1), Duration::from_secs(2));
        assert_eq!(health_penalty(12), Duration::from_secs(3600));
    }
}
