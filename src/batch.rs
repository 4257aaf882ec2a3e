//! Bounded-concurrency batch execution.
//!
//! Both executors run one effect per input key, with at most `concurrency`
//! effects in flight. A new item starts as soon as a slot frees up, so a
//! slow item never holds back the rest of the window.
//!
//! - [`for_each`] is fail-fast: the first failure cancels every running
//!   item, waits for their scoped resources to be released, and fails the
//!   whole batch with a [`BatchFailure`].
//! - [`partition`] never fails: it runs every item and sorts the outcomes
//!   into a [`BatchResult`].
//!
//! Both take `(items, concurrency, f)`, closure last: a call written
//! elsewhere as `forEach(items, f, 4)` is `for_each(items, 4, f)` here.
//!
//! Every item runs in its own [`CancelScope`], a child of the batch's. A
//! batch that is itself cancelled (a surrounding `timeout`, or a parent
//! batch failing) stops starting new items and lets the cancellation
//! unwind the running ones.

use std::convert::Infallible;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::cancel::{CancelScope, CleanupFailure};
use crate::effect::Effect;
use crate::registry::Requirements;
use crate::tagged::Tagged;

/// Where an item of a fail-fast batch ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    /// Never started.
    Pending,
    /// Started and not finished.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Cancelled while running because another item failed.
    Cancelled,
}

/// Outcome of [`partition`]: every key lands in exactly one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult<K, T, E> {
    /// Keys whose effect succeeded, with their values, in completion order.
    pub succeeded: Vec<(K, T)>,
    /// Keys whose effect failed, with their errors, in completion order.
    pub failed: Vec<(K, E)>,
}

impl<K, T, E> BatchResult<K, T, E> {
    /// Whether no item failed.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Whether the batch had no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, T, E> Default for BatchResult<K, T, E> {
    fn default() -> Self {
        BatchResult {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Error of a fail-fast [`for_each`] batch.
#[derive(Debug)]
pub struct BatchFailure<K, E> {
    /// Key of the item whose failure stopped the batch.
    pub key: K,
    /// Its error.
    pub error: E,
    /// Final state of every item, in input order.
    pub states: Vec<(K, ItemState)>,
    /// Release failures of cancelled items, in the order they happened.
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl<K, E> BatchFailure<K, E> {
    /// Keys of the items cancelled because of the failure.
    pub fn cancelled(&self) -> impl Iterator<Item = &K> {
        self.keys_in(ItemState::Cancelled)
    }

    /// Keys of the items that never started.
    pub fn not_started(&self) -> impl Iterator<Item = &K> {
        self.keys_in(ItemState::Pending)
    }

    fn keys_in(&self, wanted: ItemState) -> impl Iterator<Item = &K> {
        self.states
            .iter()
            .filter(move |(_, state)| *state == wanted)
            .map(|(key, _)| key)
    }

    /// Drop the batch context, keeping the error.
    pub fn into_error(self) -> E {
        self.error
    }
}

impl<K, E: Tagged> Tagged for BatchFailure<K, E> {
    fn tag(&self) -> &'static str {
        self.error.tag()
    }
}

impl<K: std::fmt::Debug, E: std::fmt::Display> std::fmt::Display for BatchFailure<K, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "batch item {:?} failed: {}", self.key, self.error)?;
        if !self.cleanup_failures.is_empty() {
            write!(
                f,
                " ({} release failure(s) while cancelling)",
                self.cleanup_failures.len()
            )?;
        }
        Ok(())
    }
}

impl<K, E> std::error::Error for BatchFailure<K, E>
where
    K: std::fmt::Debug,
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Fail-fast batch. Created by [`for_each`].
pub struct ForEach<K, F> {
    items: Vec<K>,
    concurrency: usize,
    f: F,
}

impl<K, F> std::fmt::Debug for ForEach<K, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForEach")
            .field("items", &self.items.len())
            .field("concurrency", &self.concurrency)
            .field("f", &"<function>")
            .finish()
    }
}

/// Run `f(key)` for every key, at most `concurrency` at a time, failing
/// fast.
///
/// Succeeds with every `(key, value)` in completion order. On the first
/// failure the running items are cancelled (their release handlers run to
/// completion), no further item starts, and the batch fails with a
/// [`BatchFailure`] naming the failed key. A `concurrency` of 0 is treated
/// as 1.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let doubled = for_each(vec![1, 2, 3], 2, |n| succeed::<_, String, ()>(n * 2));
/// let mut values = doubled.execute(&()).await.unwrap();
/// values.sort();
/// assert_eq!(values, vec![(1, 2), (2, 4), (3, 6)]);
///
/// let failing = for_each(vec![1, 2, 3], 1, |n| {
///     from_fn(move |_: &()| if n == 2 { Err("two") } else { Ok(n) })
/// });
/// let failure = failing.execute(&()).await.unwrap_err();
/// assert_eq!((failure.key, failure.error), (2, "two"));
/// # });
/// ```
pub fn for_each<I, K, F, Eff>(items: I, concurrency: usize, f: F) -> ForEach<K, F>
where
    I: IntoIterator<Item = K>,
    K: Clone + Send + Sync,
    F: Fn(K) -> Eff + Send + Sync,
    Eff: Effect,
{
    ForEach {
        items: items.into_iter().collect(),
        concurrency,
        f,
    }
}

impl<K, F, Eff> Effect for ForEach<K, F>
where
    K: Clone + Send + Sync,
    F: Fn(K) -> Eff + Send + Sync,
    Eff: Effect,
{
    type Output = Vec<(K, Eff::Output)>;
    type Error = BatchFailure<K, Eff::Error>;
    type Env = Eff::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let batch = CancelScope::child_of_current();
        let limit = self.concurrency.max(1);
        let f = &self.f;
        tracing::debug!(items = self.items.len(), concurrency = limit, "batch started");

        let mut states: Vec<(K, ItemState)> = self
            .items
            .iter()
            .map(|key| (key.clone(), ItemState::Pending))
            .collect();
        let mut queue = self.items.into_iter().enumerate();
        let launch = |index: usize, key: K| {
            let scope = batch.child();
            let effect = f(key);
            async move { (index, scope.supervise(effect.run(env)).await) }
        };

        let mut in_flight = FuturesUnordered::new();
        for (index, key) in queue.by_ref().take(limit) {
            states[index].1 = ItemState::Running;
            in_flight.push(launch(index, key));
        }

        let mut succeeded = Vec::with_capacity(states.len());
        let mut failure = None;
        while let Some((index, outcome)) = in_flight.next().await {
            match outcome {
                Some(Ok(value)) => {
                    states[index].1 = ItemState::Succeeded;
                    succeeded.push((states[index].0.clone(), value));
                }
                Some(Err(error)) => {
                    states[index].1 = ItemState::Failed;
                    failure = Some((index, error));
                    break;
                }
                None => states[index].1 = ItemState::Cancelled,
            }
            if batch.is_cancelled() {
                continue;
            }
            if let Some((index, key)) = queue.next() {
                states[index].1 = ItemState::Running;
                in_flight.push(launch(index, key));
            }
        }

        let Some((failed_index, error)) = failure else {
            if batch.is_cancelled() {
                // Whoever cancelled us drops this future once it settles.
                return std::future::pending().await;
            }
            tracing::debug!(succeeded = succeeded.len(), "batch finished");
            return Ok(succeeded);
        };

        batch.cancel();
        while let Some((index, outcome)) = in_flight.next().await {
            states[index].1 = match outcome {
                Some(Ok(_)) => ItemState::Succeeded,
                Some(Err(_)) => ItemState::Failed,
                None => ItemState::Cancelled,
            };
        }

        let cleanup_failures = batch.take_cleanup_failures();
        let key = states[failed_index].0.clone();
        tracing::debug!(
            cancelled = states.iter().filter(|(_, s)| *s == ItemState::Cancelled).count(),
            cleanup_failures = cleanup_failures.len(),
            "batch failed fast"
        );
        Err(BatchFailure {
            key,
            error,
            states,
            cleanup_failures,
        })
    }

    fn type_requirements(reqs: &mut Requirements) {
        Eff::type_requirements(reqs);
    }
}

/// Partitioning batch. Created by [`partition`].
pub struct Partition<K, F> {
    items: Vec<K>,
    concurrency: usize,
    f: F,
}

impl<K, F> std::fmt::Debug for Partition<K, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partition")
            .field("items", &self.items.len())
            .field("concurrency", &self.concurrency)
            .field("f", &"<function>")
            .finish()
    }
}

/// Run `f(key)` for every key, at most `concurrency` at a time, collecting
/// successes and failures separately.
///
/// Never fails. Each failure is reported with the key that produced it. A
/// `concurrency` of 0 is treated as 1.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let checked = partition(vec!["a", "b", "c"], 2, |key| {
///     from_fn(move |_: &()| if key == "b" { Err("not found") } else { Ok(key.len()) })
/// });
///
/// let result = checked.execute(&()).await.unwrap();
/// assert_eq!(result.succeeded.len(), 2);
/// assert_eq!(result.failed, vec![("b", "not found")]);
/// # });
/// ```
pub fn partition<I, K, F, Eff>(items: I, concurrency: usize, f: F) -> Partition<K, F>
where
    I: IntoIterator<Item = K>,
    K: Clone + Send + Sync,
    F: Fn(K) -> Eff + Send + Sync,
    Eff: Effect,
{
    Partition {
        items: items.into_iter().collect(),
        concurrency,
        f,
    }
}

impl<K, F, Eff> Effect for Partition<K, F>
where
    K: Clone + Send + Sync,
    F: Fn(K) -> Eff + Send + Sync,
    Eff: Effect,
{
    type Output = BatchResult<K, Eff::Output, Eff::Error>;
    type Error = Infallible;
    type Env = Eff::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Infallible> {
        let batch = CancelScope::child_of_current();
        let limit = self.concurrency.max(1);
        let f = &self.f;
        tracing::debug!(items = self.items.len(), concurrency = limit, "batch started");

        let mut queue = self.items.into_iter();
        let launch = |key: K| {
            let scope = batch.child();
            let effect = f(key.clone());
            async move { (key, scope.supervise(effect.run(env)).await) }
        };

        let mut in_flight: FuturesUnordered<_> = queue.by_ref().take(limit).map(&launch).collect();
        let mut result = BatchResult::default();
        while let Some((key, outcome)) = in_flight.next().await {
            match outcome {
                Some(Ok(value)) => result.succeeded.push((key, value)),
                Some(Err(error)) => result.failed.push((key, error)),
                None => {}
            }
            if batch.is_cancelled() {
                continue;
            }
            if let Some(key) = queue.next() {
                in_flight.push(launch(key));
            }
        }

        if batch.is_cancelled() {
            return std::future::pending().await;
        }
        tracing::debug!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "batch finished"
        );
        Ok(result)
    }

    fn type_requirements(reqs: &mut Requirements) {
        Eff::type_requirements(reqs);
    }
}
