//! Scoped resources: acquire, use, release.
//!
//! [`acquire_release`] guarantees that a successfully acquired resource is
//! released exactly once, after the body completes: on success, on a typed
//! failure, and on cancellation. Nested scopes release in reverse
//! acquisition order.
//!
//! Release failures are never dropped. They are reported through
//! [`ScopeError`], together with the body's failure when both happen.
//! Nested scopes flatten into one `ScopeError`: an outer scope appends its
//! own release failure after the inner ones, so `releases` lists failures
//! in the order the releases ran.
//!
//! # Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use wellspring::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
//!
//! let effect = acquire_release(
//!     from_fn(move |_: &()| {
//!         l1.lock().unwrap().push("open");
//!         Ok::<_, String>("conn")
//!     }),
//!     move |_conn| {
//!         from_fn(move |_: &()| {
//!             l2.lock().unwrap().push("close");
//!             Ok::<_, String>(())
//!         })
//!     },
//!     move |conn: &&str| {
//!         l3.lock().unwrap().push("use");
//!         succeed::<_, String, ()>(conn.len())
//!     },
//! );
//!
//! assert_eq!(effect.execute(&()).await, Ok(4));
//! assert_eq!(*log.lock().unwrap(), vec!["open", "use", "close"]);
//! # });
//! ```

use crate::cancel::{CancelScope, CleanupFailure};
use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// Failure of a scoped computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError<E> {
    /// Acquisition or the body failed; every release succeeded.
    Failure(E),
    /// The body succeeded but releases failed, in the order they ran.
    Release(Vec<E>),
    /// The body failed and releases failed too.
    Both {
        /// The acquisition or body failure.
        failure: E,
        /// The release failures, in the order they ran.
        releases: Vec<E>,
    },
}

impl<E> From<E> for ScopeError<E> {
    fn from(error: E) -> Self {
        ScopeError::Failure(error)
    }
}

impl<E> ScopeError<E> {
    /// The acquisition or body failure, if any.
    pub fn failure(&self) -> Option<&E> {
        match self {
            ScopeError::Failure(e) | ScopeError::Both { failure: e, .. } => Some(e),
            ScopeError::Release(_) => None,
        }
    }

    /// Release failures, in the order the releases ran.
    pub fn release_errors(&self) -> &[E] {
        match self {
            ScopeError::Failure(_) => &[],
            ScopeError::Release(releases) | ScopeError::Both { releases, .. } => releases,
        }
    }

    /// Transform every contained error.
    pub fn map<F, E2>(self, f: F) -> ScopeError<E2>
    where
        F: Fn(E) -> E2,
    {
        match self {
            ScopeError::Failure(e) => ScopeError::Failure(f(e)),
            ScopeError::Release(releases) => {
                ScopeError::Release(releases.into_iter().map(f).collect())
            }
            ScopeError::Both { failure, releases } => ScopeError::Both {
                failure: f(failure),
                releases: releases.into_iter().map(f).collect(),
            },
        }
    }

    fn with_release(self, release: E) -> Self {
        match self {
            ScopeError::Failure(failure) => ScopeError::Both {
                failure,
                releases: vec![release],
            },
            ScopeError::Release(mut releases) => {
                releases.push(release);
                ScopeError::Release(releases)
            }
            ScopeError::Both {
                failure,
                mut releases,
            } => {
                releases.push(release);
                ScopeError::Both { failure, releases }
            }
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for ScopeError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn join<E: std::fmt::Display>(errors: &[E]) -> String {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        }

        match self {
            ScopeError::Failure(e) => write!(f, "{}", e),
            ScopeError::Release(releases) => write!(f, "release failed: {}", join(releases)),
            ScopeError::Both { failure, releases } => write!(
                f,
                "{}; release also failed: {}",
                failure,
                join(releases)
            ),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ScopeError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScopeError::Failure(e) | ScopeError::Both { failure: e, .. } => Some(e),
            ScopeError::Release(releases) => releases.first().map(|e| e as _),
        }
    }
}

/// Acquire a resource, use it, release it.
///
/// See [`acquire_release`].
pub struct AcquireRelease<Acq, Rel, Use> {
    acquire: Acq,
    release: Rel,
    use_fn: Use,
}

impl<Acq, Rel, Use> std::fmt::Debug for AcquireRelease<Acq, Rel, Use> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquireRelease")
            .field("acquire", &"<effect>")
            .field("release", &"<function>")
            .field("use_fn", &"<function>")
            .finish()
    }
}

/// Acquire a resource, run `use_fn` with it, then release it.
///
/// - `acquire` produces the resource. If it fails nothing is released.
/// - `use_fn` borrows the resource and builds the body effect.
/// - `release` takes ownership of the resource and returns the effect that
///   releases it. It runs exactly once, whatever the body did.
///
/// When the enclosing [`CancelScope`] is cancelled while the body runs, the
/// body is interrupted at its next suspension point, after any resource it
/// acquired itself has been released. The release then runs, and a release
/// failure is recorded on the scope as a [`CleanupFailure`] and logged.
///
/// Acquisition and body errors may be `E` or an already scoped
/// `ScopeError<E>` from a nested `acquire_release`; both flatten into the
/// result's `ScopeError<E>`.
pub fn acquire_release<Acq, Rel, Use, RelEff, UseEff>(
    acquire: Acq,
    release: Rel,
    use_fn: Use,
) -> AcquireRelease<Acq, Rel, Use>
where
    Acq: Effect,
    Rel: FnOnce(Acq::Output) -> RelEff + Send,
    RelEff: Effect<Output = (), Env = Acq::Env>,
    Use: FnOnce(&Acq::Output) -> UseEff + Send,
    UseEff: Effect<Env = Acq::Env>,
{
    AcquireRelease {
        acquire,
        release,
        use_fn,
    }
}

impl<Acq, Rel, Use, RelEff, UseEff, E> Effect for AcquireRelease<Acq, Rel, Use>
where
    Acq: Effect,
    Rel: FnOnce(Acq::Output) -> RelEff + Send,
    RelEff: Effect<Output = (), Error = E, Env = Acq::Env>,
    Use: FnOnce(&Acq::Output) -> UseEff + Send,
    UseEff: Effect<Env = Acq::Env>,
    ScopeError<E>: From<Acq::Error> + From<UseEff::Error>,
    E: Send + 'static,
{
    type Output = UseEff::Output;
    type Error = ScopeError<E>;
    type Env = Acq::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let resource = match self.acquire.run(env).await {
            Ok(resource) => resource,
            Err(error) => return Err(ScopeError::<E>::from(error)),
        };

        let scope = CancelScope::current();
        let guard = scope.as_ref().map(CancelScope::open_guard);
        let body = (self.use_fn)(&resource).run(env);

        let outcome = match (&scope, &guard) {
            (Some(scope), Some(guard)) => scope.interruptible(guard.depth(), body).await,
            _ => Some(body.await),
        };

        let released = (self.release)(resource).run(env).await;

        let Some(outcome) = outcome else {
            if let Err(error) = released {
                tracing::error!(
                    error_type = std::any::type_name::<E>(),
                    "release failed while cancelling scope"
                );
                if let Some(scope) = &scope {
                    scope.record_cleanup_failure(CleanupFailure::new(error));
                }
            }
            drop(guard);
            // Cancelled: the supervising executor drops this future once
            // the scope has settled.
            return std::future::pending().await;
        };
        drop(guard);

        match (outcome.map_err(ScopeError::<E>::from), released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release)) => {
                tracing::warn!("resource released with an error");
                Err(ScopeError::Release(vec![release]))
            }
            (Err(failure), Ok(())) => Err(failure),
            (Err(failure), Err(release)) => {
                tracing::warn!("resource released with an error after a failure");
                Err(failure.with_release(release))
            }
        }
    }

    fn requirements(&self, reqs: &mut Requirements) {
        self.acquire.requirements(reqs);
        UseEff::type_requirements(reqs);
        RelEff::type_requirements(reqs);
    }

    fn type_requirements(reqs: &mut Requirements) {
        Acq::type_requirements(reqs);
        UseEff::type_requirements(reqs);
        RelEff::type_requirements(reqs);
    }
}
