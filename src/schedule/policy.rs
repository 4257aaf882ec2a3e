//! Schedule types and configuration.

use std::time::Duration;

use super::error::ScheduleError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A schedule describing when to retry a failed effect.
///
/// Schedules are pure data: they describe retry behavior but don't execute
/// it. This makes them easy to test, clone, inspect and store in
/// configuration.
///
/// # Bounds
///
/// - `max_retries`: maximum number of retries (not counting the first attempt)
/// - `max_delay`: cap on any single delay
///
/// A schedule without `max_retries` retries forever; [`validate`](Schedule::validate)
/// rejects schedules with neither bound.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use wellspring::Schedule;
///
/// // Exponential backoff with max retries
/// let schedule = Schedule::exponential(Duration::from_millis(100)).with_max_retries(5);
/// assert_eq!(schedule.max_retries(), Some(5));
///
/// // Retry three times without waiting
/// let schedule = Schedule::recurs(3);
/// assert_eq!(schedule.delay_for_attempt(2), Some(Duration::ZERO));
/// assert_eq!(schedule.delay_for_attempt(3), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Schedule {
    strategy: ScheduleStrategy,
    #[cfg_attr(feature = "serde", serde(default))]
    max_retries: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    max_delay: Option<Duration>,
    #[cfg_attr(feature = "serde", serde(default))]
    jitter: JitterStrategy,
}

/// The backoff strategy for retry delays.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScheduleStrategy {
    /// No delay between attempts.
    Immediate,
    /// Fixed delay between attempts.
    Constant(Duration),
    /// Delay increases linearly: base * (attempt + 1).
    Linear {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay doubles: base * 2^attempt.
    Exponential {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay follows the Fibonacci sequence: fib(attempt + 1) * base.
    Fibonacci {
        /// Base delay duration.
        base: Duration,
    },
}

/// Strategy for adding randomness to delays.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JitterStrategy {
    /// No jitter applied.
    #[default]
    None,
    /// Add ±factor randomness to the delay.
    Proportional(f64),
    /// Random delay between 0 and the calculated delay.
    Full,
    /// Random delay between the calculated delay and 3x the previous one.
    Decorrelated,
}

impl Schedule {
    fn with_strategy(strategy: ScheduleStrategy) -> Self {
        Self {
            strategy,
            max_retries: None,
            max_delay: None,
            jitter: JitterStrategy::None,
        }
    }

    /// Retry `n` times, immediately.
    ///
    /// The effect runs at most `1 + n` times.
    pub fn recurs(n: u32) -> Self {
        Self::with_strategy(ScheduleStrategy::Immediate).with_max_retries(n)
    }

    /// Retry with no delay. Unbounded until a bound is added.
    pub fn immediate() -> Self {
        Self::with_strategy(ScheduleStrategy::Immediate)
    }

    /// Constant delay between retries.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use wellspring::Schedule;
    ///
    /// let schedule = Schedule::constant(Duration::from_millis(500)).with_max_retries(3);
    ///
    /// assert_eq!(schedule.delay_for_attempt(0), Some(Duration::from_millis(500)));
    /// assert_eq!(schedule.delay_for_attempt(2), Some(Duration::from_millis(500)));
    /// assert_eq!(schedule.delay_for_attempt(3), None);
    /// ```
    pub fn constant(delay: Duration) -> Self {
        Self::with_strategy(ScheduleStrategy::Constant(delay))
    }

    /// Linearly increasing delay: base * (attempt + 1).
    pub fn linear(base: Duration) -> Self {
        Self::with_strategy(ScheduleStrategy::Linear { base })
    }

    /// Exponentially increasing delay: base * 2^attempt.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use wellspring::Schedule;
    ///
    /// let schedule = Schedule::exponential(Duration::from_millis(100)).with_max_retries(5);
    ///
    /// assert_eq!(schedule.delay_for_attempt(0), Some(Duration::from_millis(100)));
    /// assert_eq!(schedule.delay_for_attempt(1), Some(Duration::from_millis(200)));
    /// assert_eq!(schedule.delay_for_attempt(2), Some(Duration::from_millis(400)));
    /// ```
    pub fn exponential(base: Duration) -> Self {
        Self::with_strategy(ScheduleStrategy::Exponential { base })
    }

    /// Fibonacci delay: 1, 1, 2, 3, 5, ... times base.
    pub fn fibonacci(base: Duration) -> Self {
        Self::with_strategy(ScheduleStrategy::Fibonacci { base })
    }

    /// Set the maximum number of retries.
    ///
    /// This does not include the first attempt: `with_max_retries(3)`
    /// means up to 4 runs in total.
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Cap every delay at `d`, jitter included.
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = Some(d);
        self
    }

    /// Add proportional jitter; `0.25` means ±25%. Clamped to `0.0..=1.0`.
    ///
    /// Only takes effect with the `jitter` feature.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter = JitterStrategy::Proportional(factor.clamp(0.0, 1.0));
        self
    }

    /// Use full jitter. Only takes effect with the `jitter` feature.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Full;
        self
    }

    /// Use decorrelated jitter. Only takes effect with the `jitter` feature.
    pub fn with_decorrelated_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Decorrelated;
        self
    }

    /// Get the maximum number of retries.
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Get the maximum delay cap.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Get the jitter strategy.
    pub fn jitter(&self) -> &JitterStrategy {
        &self.jitter
    }

    /// Get the backoff strategy.
    pub fn strategy(&self) -> &ScheduleStrategy {
        &self.strategy
    }

    /// The delay before retry number `attempt` (0-indexed), without jitter.
    ///
    /// Returns `None` once the schedule is exhausted.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_retries {
            if attempt >= max {
                return None;
            }
        }

        let base_delay = match &self.strategy {
            ScheduleStrategy::Immediate => Duration::ZERO,
            ScheduleStrategy::Constant(d) => *d,
            ScheduleStrategy::Linear { base } => base.saturating_mul(attempt.saturating_add(1)),
            ScheduleStrategy::Exponential { base } => {
                base.saturating_mul(2u32.saturating_pow(attempt))
            }
            ScheduleStrategy::Fibonacci { base } => {
                base.saturating_mul(fibonacci(attempt.saturating_add(1)))
            }
        };

        Some(match self.max_delay {
            Some(max) => base_delay.min(max),
            None => base_delay,
        })
    }

    /// The delay before retry number `attempt`, with jitter applied.
    #[doc(hidden)]
    pub fn delay_with_jitter(
        &self,
        attempt: u32,
        prev_delay: Option<Duration>,
    ) -> Option<Duration> {
        let base_delay = self.delay_for_attempt(attempt)?;
        Some(self.jitter.apply(base_delay, prev_delay, self.max_delay))
    }

    /// Check that the schedule ends.
    ///
    /// # Errors
    ///
    /// [`ScheduleError::Unbounded`] when `max_retries` is not set, even if
    /// `max_delay` is.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        match self.max_retries {
            Some(_) => Ok(()),
            None => Err(ScheduleError::Unbounded),
        }
    }
}

impl JitterStrategy {
    /// Apply jitter to `base_delay`, then cap at `max_delay`.
    ///
    /// `prev_delay` is the previous delay, used by decorrelated jitter.
    pub fn apply(
        &self,
        base_delay: Duration,
        #[cfg_attr(not(feature = "jitter"), allow(unused_variables))] prev_delay: Option<Duration>,
        max_delay: Option<Duration>,
    ) -> Duration {
        let jittered = match self {
            JitterStrategy::None => base_delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Proportional(factor) => {
                use rand::Rng;
                let base_millis = base_delay.as_millis() as f64;
                let range = base_millis * factor;
                let min = (base_millis - range).max(0.0);
                let max = base_millis + range;
                if max <= min {
                    base_delay
                } else {
                    Duration::from_millis(rand::rng().random_range(min..=max) as u64)
                }
            }
            #[cfg(feature = "jitter")]
            JitterStrategy::Full => {
                use rand::Rng;
                let max_millis = base_delay.as_millis() as u64;
                if max_millis == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(rand::rng().random_range(0..=max_millis))
                }
            }
            #[cfg(feature = "jitter")]
            JitterStrategy::Decorrelated => {
                use rand::Rng;
                let prev = prev_delay.unwrap_or(base_delay);
                let base_millis = base_delay.as_millis() as u64;
                let max_millis = prev.as_millis().saturating_mul(3) as u64;
                if max_millis <= base_millis {
                    base_delay
                } else {
                    Duration::from_millis(rand::rng().random_range(base_millis..=max_millis))
                }
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Proportional(_) | JitterStrategy::Full | JitterStrategy::Decorrelated => {
                base_delay
            }
        };

        match max_delay {
            Some(max) => jittered.min(max),
            None => jittered,
        }
    }
}

/// The nth Fibonacci number, saturating.
fn fibonacci(n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let mut a = 0u32;
    let mut b = 1u32;
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    b
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[test]
    fn test_recurs_is_immediate_and_bounded() {
        let schedule = Schedule::recurs(3);

        assert_eq!(schedule.strategy(), &ScheduleStrategy::Immediate);
        assert_eq!(schedule.max_retries(), Some(3));
        for attempt in 0..3 {
            assert_eq!(schedule.delay_for_attempt(attempt), Some(Duration::ZERO));
        }
        assert_eq!(schedule.delay_for_attempt(3), None);
    }

    #[test]
    fn test_recurs_zero_never_retries() {
        assert_eq!(Schedule::recurs(0).delay_for_attempt(0), None);
    }

    #[test]
    fn test_linear_delay() {
        let schedule = Schedule::linear(Duration::from_millis(100)).with_max_retries(5);

        assert_eq!(schedule.delay_for_attempt(0), Some(Duration::from_millis(100)));
        assert_eq!(schedule.delay_for_attempt(1), Some(Duration::from_millis(200)));
        assert_eq!(schedule.delay_for_attempt(3), Some(Duration::from_millis(400)));
    }

    #[test]
    fn test_fibonacci_delay() {
        let schedule = Schedule::fibonacci(Duration::from_millis(100)).with_max_retries(6);

        let delays: Vec<_> = (0..6)
            .filter_map(|n| schedule.delay_for_attempt(n))
            .map(|d| d.as_millis())
            .collect();
        assert_eq!(delays, vec![100, 100, 200, 300, 500, 800]);
    }

    #[test]
    fn test_max_delay_cap() {
        let schedule = Schedule::exponential(Duration::from_millis(100))
            .with_max_retries(10)
            .with_max_delay(Duration::from_millis(500));

        assert_eq!(schedule.delay_for_attempt(2), Some(Duration::from_millis(400)));
        assert_eq!(schedule.delay_for_attempt(3), Some(Duration::from_millis(500)));
        assert_eq!(schedule.delay_for_attempt(9), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_exponential_saturates() {
        let schedule = Schedule::exponential(Duration::from_secs(1)).with_max_retries(200);
        assert!(schedule.delay_for_attempt(150).is_some());
    }

    #[test]
    fn test_fibonacci_function() {
        let values: Vec<_> = (0..8).map(fibonacci).collect();
        assert_eq!(values, vec![0, 1, 1, 2, 3, 5, 8, 13]);
    }

    #[test]
    fn test_validate() {
        assert!(Schedule::recurs(3).validate().is_ok());
        assert!(Schedule::constant(Duration::from_millis(100))
            .with_max_retries(2)
            .with_max_delay(Duration::from_secs(5))
            .validate()
            .is_ok());
        assert!(Schedule::constant(Duration::from_millis(100)).validate().is_err());
        assert!(Schedule::immediate().validate().is_err());
    }

    #[test]
    fn test_validate_max_delay_alone_is_unbounded() {
        let schedule = Schedule::exponential(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5));

        assert_eq!(schedule.validate(), Err(ScheduleError::Unbounded));
        assert!(schedule.delay_for_attempt(10_000).is_some());
    }

    #[test]
    fn test_jitter_none_returns_base_delay() {
        let base = Duration::from_millis(100);
        assert_eq!(JitterStrategy::None.apply(base, None, None), base);
    }

    #[test]
    fn test_jitter_respects_max_delay() {
        let base = Duration::from_millis(100);
        let capped = JitterStrategy::Full.apply(base, None, Some(Duration::from_millis(10)));
        assert!(capped <= Duration::from_millis(10));
    }

    #[test]
    fn test_with_jitter_clamps_factor() {
        let schedule = Schedule::constant(Duration::from_millis(100)).with_jitter(4.0);
        assert_eq!(schedule.jitter(), &JitterStrategy::Proportional(1.0));
    }
}
