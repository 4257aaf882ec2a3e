//! Error types for timed and retried effects.

use std::time::Duration;

use crate::cancel::CleanupFailure;
use crate::tagged::Tagged;

/// A [`Schedule`](crate::Schedule) that cannot drive a retry loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// No `max_retries` cap: the loop would retry a failing effect forever.
    /// `max_delay` caps each wait, not the number of attempts.
    #[error("retry schedule has no max_retries cap")]
    Unbounded,
}

/// Error of an effect bounded by
/// [`EffectExt::timeout`](crate::effect::EffectExt::timeout).
///
/// Either the time ran out, or the effect failed on its own first.
///
/// When time runs out the effect is cancelled and its held resources are
/// released before `Elapsed` is returned. Releases that failed during that
/// unwinding are carried in `cleanup_failures`.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use wellspring::prelude::*;
/// use wellspring::TimeoutError;
///
/// # tokio_test::block_on(async {
/// let effect = from_async(|_: &()| async {
///     tokio::time::sleep(Duration::from_secs(10)).await;
///     Ok::<_, String>(42)
/// })
/// .timeout(Duration::from_millis(10));
///
/// match effect.execute(&()).await {
///     Err(TimeoutError::Elapsed { duration, cleanup_failures }) => {
///         assert_eq!(duration, Duration::from_millis(10));
///         assert!(cleanup_failures.is_empty());
///     }
///     _ => panic!("Expected timeout"),
/// }
/// # });
/// ```
#[derive(Debug)]
pub enum TimeoutError<E> {
    /// The time limit passed before the effect finished.
    Elapsed {
        /// The limit that was exceeded.
        duration: Duration,
        /// Releases that failed while the effect was being cancelled.
        cleanup_failures: Vec<CleanupFailure>,
    },
    /// The effect failed before the limit.
    Inner(E),
}

impl<E> TimeoutError<E> {
    /// Returns true if the time limit passed.
    pub fn is_elapsed(&self) -> bool {
        matches!(self, Self::Elapsed { .. })
    }

    /// Returns true if the effect failed on its own.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// Release failures from cancelling the effect, if time ran out.
    pub fn cleanup_failures(&self) -> &[CleanupFailure] {
        match self {
            Self::Elapsed {
                cleanup_failures, ..
            } => cleanup_failures,
            Self::Inner(_) => &[],
        }
    }

    /// The effect's own error, if that is what happened.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Elapsed { .. } => None,
        }
    }
}

impl<E: Tagged> Tagged for TimeoutError<E> {
    fn tag(&self) -> &'static str {
        match self {
            Self::Elapsed { .. } => "TimeoutElapsed",
            Self::Inner(e) => e.tag(),
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for TimeoutError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Elapsed {
                duration,
                cleanup_failures,
            } => {
                write!(f, "operation timed out after {:?}", duration)?;
                if !cleanup_failures.is_empty() {
                    write!(
                        f,
                        " ({} release(s) failed while cancelling)",
                        cleanup_failures.len()
                    )?;
                }
                Ok(())
            }
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TimeoutError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Elapsed { .. } => None,
            Self::Inner(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_elapsed() {
        let err: TimeoutError<String> = TimeoutError::Elapsed {
            duration: Duration::from_secs(5),
            cleanup_failures: Vec::new(),
        };
        assert!(err.is_elapsed());
        assert!(err.cleanup_failures().is_empty());
        assert!(!err.is_inner());
        assert!(err.into_inner().is_none());
    }

    #[test]
    fn test_inner() {
        let err = TimeoutError::Inner("inner error".to_string());
        assert!(!err.is_elapsed());
        assert!(err.cleanup_failures().is_empty());
        assert_eq!(err.into_inner(), Some("inner error".to_string()));
    }

    #[test]
    fn test_display() {
        let elapsed: TimeoutError<String> = TimeoutError::Elapsed {
            duration: Duration::from_secs(5),
            cleanup_failures: Vec::new(),
        };
        assert_eq!(elapsed.to_string(), "operation timed out after 5s");

        let unclean: TimeoutError<String> = TimeoutError::Elapsed {
            duration: Duration::from_secs(5),
            cleanup_failures: vec![CleanupFailure::new("reset")],
        };
        assert_eq!(
            unclean.to_string(),
            "operation timed out after 5s (1 release(s) failed while cancelling)"
        );

        let inner = TimeoutError::Inner("failed".to_string());
        assert_eq!(inner.to_string(), "failed");
    }

    #[test]
    fn test_tag_delegates_to_inner() {
        struct Unavailable;
        crate::tagged!(Unavailable);

        assert_eq!(TimeoutError::Inner(Unavailable).tag(), "Unavailable");
        let elapsed: TimeoutError<Unavailable> = TimeoutError::Elapsed {
            duration: Duration::from_millis(1),
            cleanup_failures: Vec::new(),
        };
        assert_eq!(elapsed.tag(), "TimeoutElapsed");
    }
}
