//! Bounded exponential backoff for page requests.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

use super::config::RetryConfig;

/// Something that can wait.
///
/// Production code uses [`TokioSleeper`]; tests inject a recording fake so
/// delays can be asserted without waiting in real time.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry policy for a single page.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap for exponential growth.
    pub max_delay: Duration,
    /// Growth factor per retry.
    pub multiplier: f64,
    /// Attempts per page, including the first one.
    pub max_attempts: u32,
    /// Randomize delays within `[delay/2, delay]`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
            max_attempts: config.max_attempts,
            jitter: config.jitter,
        }
    }

    /// A fixed delay with no growth and no jitter.
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            max_attempts,
            jitter: false,
        }
    }

    /// Un-jittered delay before the given retry (0-indexed).
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.min(i32::MAX as u32) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = delay.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else if capped.is_finite() {
            Duration::ZERO
        } else {
            self.max_delay
        }
    }

    /// Delay to wait before the given retry (0-indexed), jitter applied.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        if !self.jitter || base.is_zero() {
            return base;
        }
        let secs = base.as_secs_f64();
        Duration::from_secs_f64(rand::thread_rng().gen_range(secs / 2.0..=secs))
    }

    /// Whether `attempts` attempts have used up the budget.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(jitter: bool) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts: 4,
            jitter,
        }
    }

    #[test]
    fn test_base_delay_grows_and_caps() {
        let p = policy(false);
        assert_eq!(p.base_delay(0), Duration::from_secs(5));
        assert_eq!(p.base_delay(1), Duration::from_secs(10));
        assert_eq!(p.base_delay(2), Duration::from_secs(20));
        assert_eq!(p.base_delay(3), Duration::from_secs(40));
        assert_eq!(p.base_delay(4), Duration::from_secs(60)); // capped
        assert_eq!(p.base_delay(1000), Duration::from_secs(60));
    }

    #[test]
    fn test_delay_without_jitter_is_exact() {
        let p = policy(false);
        assert_eq!(p.delay_for(1), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let p = policy(true);
        for _ in 0..100 {
            let d = p.delay_for(1);
            assert!(d >= Duration::from_secs(5));
            assert!(d <= Duration::from_secs(10));
        }
    }

    #[test]
    fn test_fixed_policy() {
        let p = RetryPolicy::fixed(Duration::from_secs(5), 3);
        assert_eq!(p.delay_for(0), Duration::from_secs(5));
        assert_eq!(p.delay_for(7), Duration::from_secs(5));
    }

    #[test]
    fn test_is_exhausted() {
        let p = policy(false);
        assert!(!p.is_exhausted(1));
        assert!(!p.is_exhausted(3));
        assert!(p.is_exhausted(4));
    }

    #[test]
    fn test_from_config() {
        let p = RetryPolicy::from_config(&RetryConfig::default());
        assert_eq!(p.initial_delay, Duration::from_secs(5));
        assert_eq!(p.max_delay, Duration::from_secs(300));
        assert_eq!(p.max_attempts, 8);
        assert!(p.jitter);
    }
}
