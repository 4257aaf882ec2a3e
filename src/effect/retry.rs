//! Retry and timeout combinators.
//!
//! Both integrate with [`Schedule`](crate::schedule::Schedule) and
//! [`TimeoutError`](crate::schedule::TimeoutError). Retrying re-creates
//! the effect from a factory for every attempt, since an effect is consumed
//! by running it.

use std::time::Duration;

use crate::cancel::CancelScope;
use crate::effect::trait_def::Effect;
use crate::registry::Requirements;
use crate::schedule::{Schedule, ScheduleError, TimeoutError};

/// Re-runs an effect according to a [`Schedule`].
///
/// Created by [`retry`] and [`retry_while`].
pub struct Retry<F, P> {
    make_effect: F,
    schedule: Schedule,
    should_retry: P,
}

impl<F, P> std::fmt::Debug for Retry<F, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retry")
            .field("make_effect", &"<function>")
            .field("schedule", &self.schedule)
            .finish()
    }
}

/// Retry an effect on failure according to `schedule`.
///
/// The effect runs once, then once more for every delay the schedule
/// yields. Success on any attempt ends the loop. When the schedule is
/// exhausted the last error is returned unchanged.
///
/// # Errors
///
/// [`ScheduleError::Unbounded`] when `schedule` has no `max_retries` cap.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let attempts = Arc::new(AtomicU32::new(0));
/// let counter = attempts.clone();
///
/// let effect = retry(
///     move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///         fail::<(), _, ()>("unavailable")
///     },
///     Schedule::recurs(3),
/// )
/// .unwrap();
///
/// assert_eq!(effect.execute(&()).await, Err("unavailable"));
/// assert_eq!(attempts.load(Ordering::SeqCst), 4);
/// # });
/// ```
pub fn retry<F, Eff>(
    make_effect: F,
    schedule: Schedule,
) -> Result<Retry<F, fn(&Eff::Error) -> bool>, ScheduleError>
where
    F: Fn() -> Eff + Send + Sync,
    Eff: Effect,
{
    let any_error: fn(&Eff::Error) -> bool = |_| true;
    retry_while(make_effect, schedule, any_error)
}

/// Retry only the errors `should_retry` accepts.
///
/// Any other error is returned immediately, without consuming the
/// schedule.
///
/// # Errors
///
/// [`ScheduleError::Unbounded`] when `schedule` has no `max_retries` cap.
pub fn retry_while<F, P, Eff>(
    make_effect: F,
    schedule: Schedule,
    should_retry: P,
) -> Result<Retry<F, P>, ScheduleError>
where
    F: Fn() -> Eff + Send + Sync,
    P: Fn(&Eff::Error) -> bool + Send + Sync,
    Eff: Effect,
{
    schedule.validate()?;
    Ok(Retry {
        make_effect,
        schedule,
        should_retry,
    })
}

impl<F, P, Eff> Effect for Retry<F, P>
where
    F: Fn() -> Eff + Send + Sync,
    P: Fn(&Eff::Error) -> bool + Send + Sync,
    Eff: Effect,
{
    type Output = Eff::Output;
    type Error = Eff::Error;
    type Env = Eff::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let mut attempt = 0u32;
        let mut prev_delay: Option<Duration> = None;

        loop {
            let effect = (self.make_effect)();
            let error = match effect.run(env).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !(self.should_retry)(&error) {
                return Err(error);
            }

            let Some(delay) = self.schedule.delay_with_jitter(attempt, prev_delay) else {
                tracing::debug!(attempts = attempt + 1, "retry schedule exhausted");
                return Err(error);
            };

            attempt += 1;
            tracing::warn!(attempt, ?delay, "effect failed, retrying");
            drop(error);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            prev_delay = Some(delay);
        }
    }

    fn type_requirements(reqs: &mut Requirements) {
        Eff::type_requirements(reqs);
    }
}

/// Bounds an effect's running time.
///
/// Created by [`EffectExt::timeout`](crate::effect::EffectExt::timeout).
pub struct Timeout<Inner> {
    pub(crate) inner: Inner,
    pub(crate) duration: Duration,
}

impl<Inner> std::fmt::Debug for Timeout<Inner> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeout")
            .field("inner", &"<effect>")
            .field("duration", &self.duration)
            .finish()
    }
}

impl<Inner: Effect> Effect for Timeout<Inner> {
    type Output = Inner::Output;
    type Error = TimeoutError<Inner::Error>;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let scope = CancelScope::child_of_current();
        let computation = scope.enter(self.inner.run(env));
        tokio::pin!(computation);

        tokio::select! {
            biased;
            result = &mut computation => return result.map_err(TimeoutError::Inner),
            () = tokio::time::sleep(self.duration) => {}
        }

        scope.drain(computation).await;
        let cleanup_failures = scope.take_cleanup_failures();
        tracing::warn!(
            duration = ?self.duration,
            cleanup_failures = cleanup_failures.len(),
            "effect timed out"
        );
        Err(TimeoutError::Elapsed {
            duration: self.duration,
            cleanup_failures,
        })
    }

    fn requirements(&self, reqs: &mut Requirements) {
        self.inner.requirements(reqs);
    }

    fn type_requirements(reqs: &mut Requirements) {
        Inner::type_requirements(reqs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::constructors::{fail, from_async, from_fn, succeed};
    use crate::effect::ext::EffectExt;
    use crate::effect::scope::acquire_release;
    use crate::testing::CallLog;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let effect = retry(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                succeed::<_, String, ()>(42)
            },
            Schedule::constant(Duration::from_millis(1)).with_max_retries(3),
        )
        .unwrap();

        assert_eq!(effect.execute(&()).await, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let effect = retry(
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                from_fn(move |_: &()| if n < 2 { Err("flaky") } else { Ok(n) })
            },
            Schedule::recurs(5),
        )
        .unwrap();

        assert_eq!(effect.execute(&()).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_recurs_runs_one_plus_n_times() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let effect = retry(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                fail::<(), _, ()>("down".to_string())
            },
            Schedule::recurs(3),
        )
        .unwrap();

        assert_eq!(effect.execute(&()).await, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_while_stops_on_permanent_error() {
        #[derive(Debug, PartialEq, Clone)]
        enum TestError {
            Transient,
            Permanent,
        }

        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let effect = retry_while(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                fail::<(), _, ()>(TestError::Permanent)
            },
            Schedule::recurs(3),
            |err| matches!(err, TestError::Transient),
        )
        .unwrap();

        assert_eq!(effect.execute(&()).await, Err(TestError::Permanent));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_between_attempts() {
        let start = tokio::time::Instant::now();
        let effect = retry(
            || fail::<(), _, ()>("down"),
            Schedule::constant(Duration::from_millis(100)).with_max_retries(2),
        )
        .unwrap();

        assert_eq!(effect.execute(&()).await, Err("down"));
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_timeout_passes_result_through() {
        let effect = succeed::<_, String, ()>(42).timeout(Duration::from_secs(1));
        assert_eq!(effect.execute(&()).await, Ok(42));

        let effect = fail::<i32, _, ()>("inner").timeout(Duration::from_secs(1));
        assert!(matches!(
            effect.execute(&()).await,
            Err(TimeoutError::Inner("inner"))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_elapsed() {
        let effect = from_async(|_: &()| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, String>(42)
        })
        .timeout(Duration::from_millis(10));

        match effect.execute(&()).await {
            Err(TimeoutError::Elapsed {
                duration,
                cleanup_failures,
            }) => {
                assert_eq!(duration, Duration::from_millis(10));
                assert!(cleanup_failures.is_empty());
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_scoped_resource() {
        let log = CallLog::new();
        let (acquire_log, release_log) = (log.clone(), log.clone());

        let effect = acquire_release(
            from_fn(move |_: &()| {
                acquire_log.record("acquire");
                Ok::<_, String>(())
            }),
            move |()| {
                from_async(move |_: &()| async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    release_log.record("release");
                    Ok::<_, String>(())
                })
            },
            |_: &()| {
                from_async(|_: &()| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok::<_, String>(())
                })
            },
        )
        .timeout(Duration::from_millis(10));

        let result = effect.execute(&()).await;

        assert!(matches!(result, Err(TimeoutError::Elapsed { .. })));
        assert_eq!(log.entries(), vec!["acquire", "release"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_failed_release_without_enclosing_scope() {
        let effect = acquire_release(
            from_fn(|_: &()| Ok::<_, String>(())),
            |()| from_fn(|_: &()| Err::<(), _>("release failed".to_string())),
            |_: &()| {
                from_async(|_: &()| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok::<_, String>(())
                })
            },
        )
        .timeout(Duration::from_millis(10));

        let error = effect.execute(&()).await.unwrap_err();

        let failures = error.cleanup_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].downcast_ref::<String>().map(String::as_str),
            Some("release failed")
        );
    }

    #[test]
    fn test_retry_rejects_schedule_without_attempt_cap() {
        let capped_delay_only = Schedule::exponential(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5));

        let result = retry(|| fail::<(), _, ()>("down"), capped_delay_only.clone());
        assert_eq!(result.unwrap_err(), ScheduleError::Unbounded);

        let result = retry_while(|| fail::<(), _, ()>("down"), capped_delay_only, |_| true);
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_with_capped_schedule_terminates() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let effect = retry(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                fail::<(), _, ()>("down")
            },
            Schedule::exponential(Duration::from_millis(1))
                .with_max_delay(Duration::from_millis(5))
                .with_max_retries(10),
        )
        .unwrap();

        assert_eq!(effect.execute(&()).await, Err("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }
}
