//! Racing effects against each other.

use futures::stream::{FuturesUnordered, StreamExt};

use crate::cancel::{CancelScope, CleanupFailure};
use crate::effect::trait_def::Effect;
use crate::registry::Requirements;
use crate::tagged::Tagged;

/// Error of a [`race`].
#[derive(Debug)]
pub enum RaceError<E> {
    /// The first effect to finish failed, and every loser released cleanly.
    Failed(E),
    /// Releasing a loser's resources failed while it was being cancelled.
    Cleanup {
        /// The winner's error, if the winner failed. A successful winner's
        /// value is dropped.
        failure: Option<E>,
        /// The failed releases.
        cleanup_failures: Vec<CleanupFailure>,
    },
}

impl<E> RaceError<E> {
    /// The winner's error, if the winner failed.
    pub fn failure(&self) -> Option<&E> {
        match self {
            Self::Failed(e) => Some(e),
            Self::Cleanup { failure, .. } => failure.as_ref(),
        }
    }

    /// Consume the error, keeping the winner's error if there was one.
    pub fn into_failure(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            Self::Cleanup { failure, .. } => failure,
        }
    }

    /// Releases that failed while the losers were cancelled.
    pub fn cleanup_failures(&self) -> &[CleanupFailure] {
        match self {
            Self::Failed(_) => &[],
            Self::Cleanup {
                cleanup_failures, ..
            } => cleanup_failures,
        }
    }
}

impl<E: Tagged> Tagged for RaceError<E> {
    fn tag(&self) -> &'static str {
        match self {
            Self::Failed(e) => e.tag(),
            Self::Cleanup { .. } => "RaceCleanupFailed",
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for RaceError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "{}", e),
            Self::Cleanup {
                failure: Some(e),
                cleanup_failures,
            } => write!(
                f,
                "{}; {} race loser release(s) also failed",
                e,
                cleanup_failures.len()
            ),
            Self::Cleanup {
                failure: None,
                cleanup_failures,
            } => write!(
                f,
                "{} race loser release(s) failed",
                cleanup_failures.len()
            ),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RaceError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failure().map(|e| e as _)
    }
}

/// Runs effects concurrently and keeps the first to finish.
///
/// Created by [`race`].
pub struct Race<Eff> {
    effects: Vec<Eff>,
}

impl<Eff> std::fmt::Debug for Race<Eff> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Race")
            .field("effects", &self.effects.len())
            .finish()
    }
}

/// Race effects, returning the result of the first to complete.
///
/// The first effect to finish wins, whether it succeeded or failed. The
/// others are cancelled, and their scoped resources are released before
/// the winner's result is returned. A winner's failure comes back as
/// [`RaceError::Failed`]; a loser's release that failed turns the result
/// into [`RaceError::Cleanup`].
///
/// # Panics
///
/// Panics when running a race of no effects.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let slow = from_async(|_: &()| async {
///     tokio::time::sleep(Duration::from_millis(200)).await;
///     Ok::<_, String>("slow")
/// })
/// .boxed();
/// let fast = from_async(|_: &()| async {
///     tokio::time::sleep(Duration::from_millis(1)).await;
///     Ok::<_, String>("fast")
/// })
/// .boxed();
///
/// assert_eq!(race(vec![slow, fast]).execute(&()).await.unwrap(), "fast");
/// # });
/// ```
pub fn race<Eff: Effect>(effects: Vec<Eff>) -> Race<Eff> {
    Race { effects }
}

impl<Eff: Effect> Effect for Race<Eff> {
    type Output = Eff::Output;
    type Error = RaceError<Eff::Error>;
    type Env = Eff::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let race = CancelScope::child_of_current();
        let mut entrants: FuturesUnordered<_> = self
            .effects
            .into_iter()
            .map(|effect| {
                let scope = race.child();
                async move { scope.enter(effect.run(env)).await }
            })
            .collect();

        let Some(winner) = entrants.next().await else {
            panic!("race requires at least one effect");
        };

        if !entrants.is_empty() {
            race.cancel();
            tokio::select! {
                biased;
                () = async { while entrants.next().await.is_some() {} } => {}
                () = race.settled() => {}
            }
        }

        let cleanup_failures = race.take_cleanup_failures();
        if cleanup_failures.is_empty() {
            return winner.map_err(RaceError::Failed);
        }
        tracing::warn!(
            cleanup_failures = cleanup_failures.len(),
            "race losers failed to release"
        );
        Err(RaceError::Cleanup {
            failure: winner.err(),
            cleanup_failures,
        })
    }

    fn requirements(&self, reqs: &mut Requirements) {
        for effect in &self.effects {
            effect.requirements(reqs);
        }
    }

    fn type_requirements(reqs: &mut Requirements) {
        Eff::type_requirements(reqs);
    }
}
