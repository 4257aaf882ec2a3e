//! Cooperative cancellation scopes.
//!
//! Executors that may abandon a running effect (the fail-fast batch,
//! `timeout`, `race`) run each effect inside a [`CancelScope`]. Scopes form
//! a tree carried in a tokio task-local: cancelling a scope cancels every
//! scope below it.
//!
//! Cancellation never kills a future outright. Scoped resources
//! ([`acquire_release`](crate::effect::acquire_release)) register an open
//! guard in the current scope for as long as they hold a resource. When a
//! scope is cancelled the executor keeps polling the cancelled effect until
//! the scope has *settled* (no guard is open), so every pending release
//! handler runs, innermost first. Only then is the effect dropped.
//!
//! Release failures that happen while unwinding a cancellation have no
//! caller to return to. They are recorded as [`CleanupFailure`]s on the
//! scope where the cancellation started (the outermost cancelled scope
//! above the resource), and the executor that cancelled that scope returns
//! them in its result.
//!
//! ```rust
//! use std::time::Duration;
//! use wellspring::cancel::CancelScope;
//!
//! # tokio_test::block_on(async {
//! let scope = CancelScope::new();
//! let work = scope.supervise(async {
//!     tokio::time::sleep(Duration::from_secs(60)).await;
//!     "finished"
//! });
//! scope.cancel();
//! assert_eq!(work.await, None);
//! # });
//! ```

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::select_all;
use tokio::sync::watch;

tokio::task_local! {
    static CURRENT: CancelScope;
}

struct ScopeState {
    cancelled: watch::Sender<bool>,
    open: watch::Sender<usize>,
    parent: Option<CancelScope>,
    failures: Mutex<Vec<CleanupFailure>>,
}

/// A node in the cancellation tree.
///
/// Cheap to clone; clones refer to the same scope.
#[derive(Clone)]
pub struct CancelScope {
    state: Arc<ScopeState>,
}

impl std::fmt::Debug for CancelScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelScope")
            .field("cancelled", &self.is_cancelled())
            .field("open_resources", &self.open_resources())
            .field("has_parent", &self.state.parent.is_some())
            .finish()
    }
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelScope {
    /// A root scope with no parent.
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<CancelScope>) -> Self {
        let (cancelled, _) = watch::channel(false);
        let (open, _) = watch::channel(0);
        CancelScope {
            state: Arc::new(ScopeState {
                cancelled,
                open,
                parent,
                failures: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The scope the calling task is running in, if any.
    pub fn current() -> Option<CancelScope> {
        CURRENT.try_with(CancelScope::clone).ok()
    }

    /// A child of the current scope, or a new root outside any scope.
    pub fn child_of_current() -> Self {
        Self::with_parent(Self::current())
    }

    /// A new child of this scope.
    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    /// Signal cancellation to this scope and all its descendants.
    pub fn cancel(&self) {
        if !self.state.cancelled.send_replace(true) {
            tracing::debug!(open = self.open_resources(), "scope cancelled");
        }
    }

    /// Whether this scope or any ancestor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.ancestry().any(|scope| *scope.state.cancelled.borrow())
    }

    /// Resolves once this scope or any ancestor is cancelled.
    pub async fn cancelled(&self) {
        let waits = self.ancestry().map(|scope| {
            let mut rx = scope.state.cancelled.subscribe();
            Box::pin(async move {
                // The sender lives as long as the scope, which `self` keeps alive.
                if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                    std::future::pending::<()>().await;
                }
            })
        });
        select_all(waits).await;
    }

    /// Number of resources currently held by effects in this scope or
    /// below it.
    pub fn open_resources(&self) -> usize {
        *self.state.open.borrow()
    }

    /// Resolves once no resource is held in this scope or below it.
    pub async fn settled(&self) {
        self.open_at_most(0).await;
    }

    async fn open_at_most(&self, depth: usize) {
        let mut rx = self.state.open.subscribe();
        if rx.wait_for(|open| *open <= depth).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Run `fut` with this scope as the current scope.
    pub async fn enter<F: Future>(&self, fut: F) -> F::Output {
        CURRENT.scope(self.clone(), fut).await
    }

    /// Run `fut` in this scope until it completes or the scope is cancelled.
    ///
    /// Returns `None` if cancellation won. In that case `fut` is polled
    /// further, until every resource opened inside it has been released,
    /// and then dropped.
    pub async fn supervise<F: Future>(&self, fut: F) -> Option<F::Output> {
        let fut = CURRENT.scope(self.clone(), fut);
        tokio::pin!(fut);
        tokio::select! {
            biased;
            output = &mut fut => return Some(output),
            () = self.cancelled() => {}
        }
        self.drain(fut).await;
        None
    }

    /// Cancel this scope and poll `fut` until the scope has settled.
    ///
    /// Release failures from the drain are left on this scope, or on an
    /// ancestor that was cancelled first, for the caller to take.
    pub(crate) async fn drain<F: Future>(&self, fut: Pin<&mut F>) {
        self.cancel();
        tokio::select! {
            biased;
            _ = fut => {}
            () = self.settled() => {}
        }
    }

    /// Poll a resource's body until it completes or, after cancellation,
    /// until every resource opened after it (at greater depth) is released.
    ///
    /// `None` means the body was interrupted and has been dropped.
    pub(crate) async fn interruptible<F: Future>(&self, depth: usize, body: F) -> Option<F::Output> {
        tokio::pin!(body);
        tokio::select! {
            biased;
            output = &mut body => return Some(output),
            () = self.cancelled() => {}
        }
        tokio::select! {
            biased;
            output = &mut body => Some(output),
            () = self.open_at_most(depth) => None,
        }
    }

    /// Register an open resource in this scope and every ancestor.
    pub(crate) fn open_guard(&self) -> OpenGuard {
        let mut depth = 0;
        for (level, scope) in self.ancestry().enumerate() {
            scope.state.open.send_modify(|open| {
                *open += 1;
                if level == 0 {
                    depth = *open;
                }
            });
        }
        OpenGuard {
            scope: self.clone(),
            depth,
        }
    }

    /// Record a release failure on the scope whose cancellation caused it:
    /// the outermost cancelled scope from here up.
    pub(crate) fn record_cleanup_failure(&self, failure: CleanupFailure) {
        let origin = self
            .ancestry()
            .filter(|scope| *scope.state.cancelled.borrow())
            .last()
            .unwrap_or(self);
        origin.lock_failures().push(failure);
    }

    /// Remove and return the cleanup failures recorded on this scope.
    pub fn take_cleanup_failures(&self) -> Vec<CleanupFailure> {
        std::mem::take(&mut *self.lock_failures())
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, Vec<CleanupFailure>> {
        self.state
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ancestry(&self) -> impl Iterator<Item = &CancelScope> {
        std::iter::successors(Some(self), |scope| scope.state.parent.as_ref())
    }
}

/// Marks a held resource. Dropping it releases the slot.
pub(crate) struct OpenGuard {
    scope: CancelScope,
    depth: usize,
}

impl OpenGuard {
    /// Position of this resource among those open in its scope, 1-based.
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        for scope in self.scope.ancestry() {
            scope
                .state
                .open
                .send_modify(|open| *open = open.saturating_sub(1));
        }
    }
}

/// A release handler that failed while a cancellation was unwinding.
pub struct CleanupFailure {
    error_type: &'static str,
    error: Box<dyn Any + Send>,
}

impl std::fmt::Debug for CleanupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupFailure")
            .field("error_type", &self.error_type)
            .finish()
    }
}

impl std::fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "release failed during cancellation with {}",
            self.error_type
        )
    }
}

impl CleanupFailure {
    pub(crate) fn new<E: Send + 'static>(error: E) -> Self {
        CleanupFailure {
            error_type: std::any::type_name::<E>(),
            error: Box::new(error),
        }
    }

    /// Type name of the release error.
    pub fn error_type(&self) -> &'static str {
        self.error_type
    }

    /// Borrow the release error if it is an `E`.
    pub fn downcast_ref<E: 'static>(&self) -> Option<&E> {
        self.error.downcast_ref()
    }

    /// Recover the release error if it is an `E`.
    ///
    /// # Errors
    ///
    /// Gives `self` back when the error has another type.
    pub fn downcast<E: 'static>(self) -> Result<E, Self> {
        let error_type = self.error_type;
        self.error
            .downcast::<E>()
            .map(|boxed| *boxed)
            .map_err(|error| CleanupFailure { error_type, error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_propagates_to_children() {
        let root = CancelScope::new();
        let child = root.child();
        let grandchild = child.child();

        child.cancel();

        assert!(!root.is_cancelled());
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn test_open_guard_counts_in_ancestors() {
        let root = CancelScope::new();
        let child = root.child();

        let outer = child.open_guard();
        let inner = child.open_guard();
        assert_eq!(outer.depth(), 1);
        assert_eq!(inner.depth(), 2);
        assert_eq!(root.open_resources(), 2);

        drop(inner);
        assert_eq!(child.open_resources(), 1);
        drop(outer);
        assert_eq!(root.open_resources(), 0);
    }

    #[tokio::test]
    async fn test_current_inside_enter() {
        assert!(CancelScope::current().is_none());

        let scope = CancelScope::new();
        let seen = scope
            .enter(async { CancelScope::current().map(|s| s.is_cancelled()) })
            .await;
        assert_eq!(seen, Some(false));
    }

    #[tokio::test]
    async fn test_supervise_returns_output() {
        let scope = CancelScope::new();
        assert_eq!(scope.supervise(async { 7 }).await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_wakes_on_ancestor() {
        let root = CancelScope::new();
        let child = root.child();

        let waiter = tokio::spawn(async move { child.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        root.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancellation observed")
            .expect("task completed");
    }

    #[test]
    fn test_cleanup_failure_downcast() {
        let failure = CleanupFailure::new("socket reset".to_string());
        assert!(failure.error_type().contains("String"));
        assert!(failure.downcast_ref::<i32>().is_none());

        let failure = failure.downcast::<i32>().unwrap_err();
        assert_eq!(failure.downcast::<String>().unwrap(), "socket reset");
    }

    #[test]
    fn test_cleanup_failure_recorded_where_cancellation_started() {
        let root = CancelScope::new();
        let timeout = root.child();
        let entrant = timeout.child();
        let resource = entrant.child();

        timeout.cancel();
        resource.record_cleanup_failure(CleanupFailure::new("reset"));

        assert_eq!(timeout.take_cleanup_failures().len(), 1);
        assert!(resource.take_cleanup_failures().is_empty());
        assert!(entrant.take_cleanup_failures().is_empty());
        assert!(root.take_cleanup_failures().is_empty());
    }

    #[tokio::test]
    async fn test_supervise_leaves_drain_failures_for_the_canceller() {
        let scope = CancelScope::new();
        let inner = scope.clone();
        let work = scope.supervise(async move {
            inner.cancel();
            if let Some(current) = CancelScope::current() {
                current.record_cleanup_failure(CleanupFailure::new(3u8));
            }
            std::future::pending::<()>().await
        });

        assert_eq!(work.await, None);
        let failures = scope.take_cleanup_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].downcast_ref::<u8>(), Some(&3));
    }

    #[test]
    fn test_take_cleanup_failures_drains() {
        let scope = CancelScope::new();
        scope.record_cleanup_failure(CleanupFailure::new(1u8));
        assert_eq!(scope.take_cleanup_failures().len(), 1);
        assert!(scope.take_cleanup_failures().is_empty());
    }
}
