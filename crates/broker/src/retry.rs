//! Reconnect delay policy
//!
//! Bounded exponential backoff with jitter. Delays start at a fixed 5 s and
//! grow to a ceiling so a long broker outage does not turn into a steady
//! retry drumbeat; an optional attempt cap is available for operators who
//! prefer a hard stop over indefinite retry.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Reconnect/retry delay policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Ceiling the delay never exceeds
    pub max_delay: Duration,

    /// Growth factor applied per consecutive failure
    pub multiplier: f64,

    /// Randomize each delay within [delay/2, delay]
    pub jitter: bool,

    /// Maximum attempts before giving up; 0 retries forever
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
            max_attempts: 0,
        }
    }
}

impl RetryPolicy {
    /// Start a backoff sequence under this policy
    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            attempt: 0,
            rng: XorShift::seeded(),
        }
    }

    /// Un-jittered delay for attempt N (0-based)
    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(32) as i32);
        let millis = (self.initial_delay.as_millis() as f64 * factor) as u64;
        Duration::from_millis(millis).min(self.max_delay)
    }
}

/// Backoff state for one connection lifecycle
///
/// `reset` is called after a successful connection so the next failure
/// starts again from the initial delay.
#[derive(Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    attempt: u32,
    rng: XorShift,
}

impl Backoff {
    /// Delay before the next attempt, or `None` when attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.policy.max_attempts > 0 && self.attempt >= self.policy.max_attempts {
            return None;
        }

        let delay = self.policy.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);

        if self.policy.jitter {
            Some(self.rng.jitter(delay))
        } else {
            Some(delay)
        }
    }

    /// Attempts consumed so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Restart the sequence from the initial delay
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Small xorshift PRNG for jitter
///
/// Delay spreading needs no cryptographic quality, just cheap decorrelation
/// between agents restarting at the same moment.
#[derive(Debug)]
struct XorShift(u64);

impl XorShift {
    fn seeded() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self((nanos ^ u64::from(std::process::id())).max(1))
    }

    fn next(&mut self) -> u64 {
        let mut state = self.0;
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        self.0 = state;
        state
    }

    /// Spread a delay uniformly over [delay/2, delay]
    fn jitter(&mut self, delay: Duration) -> Duration {
        let millis = delay.as_millis() as u64;
        if millis < 2 {
            return delay;
        }
        let half = millis / 2;
        Duration::from_millis(half + self.next() % (millis - half + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_no_jitter() -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(800),
            multiplier: 2.0,
            jitter: false,
            max_attempts: 0,
        }
    }

    #[test]
    fn test_exponential_growth_with_ceiling() {
        let mut backoff = policy_no_jitter().backoff();
        let delays: Vec<_> = (0..6).map(|_| backoff.next_delay().unwrap()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
                Duration::from_millis(800),
                Duration::from_millis(800),
            ]
        );
    }

    #[test]
    fn test_reset_restarts_sequence() {
        let mut backoff = policy_no_jitter().backoff();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_max_attempts_exhausts() {
        let mut backoff = RetryPolicy {
            max_attempts: 2,
            ..policy_no_jitter()
        }
        .backoff();

        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.attempt(), 2);
    }

    #[test]
    fn test_zero_max_attempts_never_exhausts() {
        let mut backoff = policy_no_jitter().backoff();
        for _ in 0..100 {
            assert!(backoff.next_delay().is_some());
        }
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut backoff = RetryPolicy {
            jitter: true,
            ..policy_no_jitter()
        }
        .backoff();

        for _ in 0..50 {
            backoff.reset();
            let delay = backoff.next_delay().unwrap();
            assert!(delay >= Duration::from_millis(50), "delay {delay:?}");
            assert!(delay <= Duration::from_millis(100), "delay {delay:?}");
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.initial_delay, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 0);
    }
}
