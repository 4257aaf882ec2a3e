//! Integration tests for scoped resources under failure and cancellation.
//!
//! A connection pool is provided as a capability. Every test checks that
//! each checked-out connection goes back to the pool, whichever way the
//! work ends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wellspring::cancel::CancelScope;
use wellspring::prelude::*;
use wellspring::testing::{CallLog, MockRegistry};

#[derive(Debug, Clone, PartialEq)]
struct PoolError(String);

impl std::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pool that records checkouts and returns, and can be told to fail
/// returning a named connection.
struct Pool {
    available: AtomicUsize,
    broken_return: Option<&'static str>,
    log: CallLog,
}

impl Pool {
    fn new(size: usize, log: CallLog) -> Self {
        Self {
            available: AtomicUsize::new(size),
            broken_return: None,
            log,
        }
    }

    fn checkout(&self, name: &'static str) -> Result<&'static str, PoolError> {
        let taken = self
            .available
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match taken {
            Ok(_) => {
                self.log.record(format!("checkout {name}"));
                Ok(name)
            }
            Err(_) => Err(PoolError("pool exhausted".into())),
        }
    }

    fn give_back(&self, name: &'static str) -> Result<(), PoolError> {
        self.available.fetch_add(1, Ordering::SeqCst);
        self.log.record(format!("return {name}"));
        if self.broken_return == Some(name) {
            Err(PoolError(format!("{name} was poisoned")))
        } else {
            Ok(())
        }
    }

    fn available(&self) -> usize {
        self.available.load(Ordering::SeqCst)
    }
}

struct Connections;
impl Capability for Connections {
    const NAME: &'static str = "Connections";
    type Service = Pool;
}

fn registry(pool: &Arc<Pool>) -> Registry {
    MockRegistry::new().with::<Connections>(pool.clone()).build()
}

/// Check out `name`, run `body` with it, and return it to the pool.
fn with_connection<Body, BodyEff>(
    name: &'static str,
    body: Body,
) -> impl Effect<Output = BodyEff::Output, Error = ScopeError<PoolError>, Env = Registry>
where
    Body: FnOnce(&&'static str) -> BodyEff + Send,
    BodyEff: Effect<Env = Registry>,
    ScopeError<PoolError>: From<BodyEff::Error>,
{
    acquire_release(
        with_service::<Connections, _, _>(move |pool| async move { pool.checkout(name) }),
        |conn| with_service::<Connections, _, _>(move |pool| async move { pool.give_back(conn) }),
        body,
    )
}

fn sleep_then<T: Send + 'static>(
    duration: Duration,
    value: T,
) -> impl Effect<Output = T, Error = PoolError, Env = Registry> {
    from_async(move |_: &Registry| async move {
        tokio::time::sleep(duration).await;
        Ok(value)
    })
}

#[tokio::test]
async fn connection_returned_after_success_and_failure() {
    let log = CallLog::new();
    let pool = Arc::new(Pool::new(2, log.clone()));
    let registry = registry(&pool);

    let ok = with_connection("c1", |conn: &&str| succeed::<_, PoolError, Registry>(conn.len()));
    assert_eq!(run(ok, &registry).await, Ok(2));

    let failed = with_connection("c2", |_: &&str| {
        fail::<(), _, Registry>(PoolError("query failed".into()))
    });
    assert_eq!(
        run(failed, &registry).await,
        Err(RunError::Failed(ScopeError::Failure(PoolError(
            "query failed".into()
        ))))
    );

    assert_eq!(pool.available(), 2);
    assert_eq!(
        log.entries(),
        vec!["checkout c1", "return c1", "checkout c2", "return c2"]
    );
}

#[tokio::test]
async fn exhausted_pool_fails_without_returning() {
    let log = CallLog::new();
    let pool = Arc::new(Pool::new(0, log.clone()));

    let effect = with_connection("c1", |_: &&str| succeed::<_, PoolError, Registry>(()));
    let error = run(effect, &registry(&pool)).await.unwrap_err();

    assert_eq!(
        error.into_failure(),
        Some(ScopeError::Failure(PoolError("pool exhausted".into())))
    );
    assert!(log.is_empty());
}

#[tokio::test]
async fn nested_connections_return_in_reverse_order() {
    let log = CallLog::new();
    let pool = Arc::new(Pool {
        broken_return: Some("inner"),
        ..Pool::new(2, log.clone())
    });

    let effect = with_connection("outer", |_: &&str| {
        with_connection("inner", |_: &&str| {
            fail::<(), _, Registry>(PoolError("deadlock".into()))
        })
    });

    let error = run(effect, &registry(&pool)).await.unwrap_err();
    let error = error.into_failure().unwrap();

    assert_eq!(
        log.entries(),
        vec!["checkout outer", "checkout inner", "return inner", "return outer"]
    );
    assert_eq!(error.failure(), Some(&PoolError("deadlock".into())));
    assert_eq!(error.release_errors(), &[PoolError("inner was poisoned".into())]);
    assert_eq!(
        error.to_string(),
        "deadlock; release also failed: inner was poisoned"
    );
    assert_eq!(pool.available(), 2);
}

#[tokio::test(start_paused = true)]
async fn timeout_returns_connection_before_reporting() {
    let log = CallLog::new();
    let pool = Arc::new(Pool::new(1, log.clone()));

    let effect = with_connection("slow", |_: &&str| sleep_then(Duration::from_secs(60), ()))
        .timeout(Duration::from_secs(1));

    let error = run(effect, &registry(&pool)).await.unwrap_err();

    assert!(error.into_failure().unwrap().is_elapsed());
    assert_eq!(pool.available(), 1);
    assert_eq!(log.entries(), vec!["checkout slow", "return slow"]);
}

#[tokio::test(start_paused = true)]
async fn race_loser_returns_its_connection() {
    let log = CallLog::new();
    let pool = Arc::new(Pool::new(2, log.clone()));

    let fast = with_connection("fast", |_: &&str| sleep_then(Duration::from_millis(10), "fast"));
    let slow = with_connection("slow", |_: &&str| sleep_then(Duration::from_secs(10), "slow"));

    let winner = run(race(vec![fast.boxed(), slow.boxed()]), &registry(&pool)).await;

    assert_eq!(winner.unwrap(), "fast");
    assert_eq!(pool.available(), 2);
    assert_eq!(log.count("return slow"), 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_returns_release_failure_with_elapsed() {
    let log = CallLog::new();
    let pool = Arc::new(Pool {
        broken_return: Some("slow"),
        ..Pool::new(1, log.clone())
    });

    let effect = with_connection("slow", |_: &&str| sleep_then(Duration::from_secs(60), ()))
        .timeout(Duration::from_secs(1));

    let error = run(effect, &registry(&pool)).await.unwrap_err();
    let error = error.into_failure().unwrap();

    assert!(error.is_elapsed());
    let failures = error.cleanup_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].downcast_ref::<PoolError>(),
        Some(&PoolError("slow was poisoned".into()))
    );
    assert_eq!(pool.available(), 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_inside_enclosing_scope_still_owns_its_release_failures() {
    let log = CallLog::new();
    let pool = Arc::new(Pool {
        broken_return: Some("slow"),
        ..Pool::new(1, log.clone())
    });
    let registry = registry(&pool);

    let effect = with_connection("slow", |_: &&str| sleep_then(Duration::from_secs(60), ()))
        .timeout(Duration::from_secs(1));

    let root = CancelScope::new();
    let result = root.enter(run(effect, &registry)).await;

    let error = result.unwrap_err().into_failure().unwrap();
    assert_eq!(error.cleanup_failures().len(), 1);
    assert!(root.take_cleanup_failures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn race_reports_loser_release_failure() {
    let log = CallLog::new();
    let pool = Arc::new(Pool {
        broken_return: Some("slow"),
        ..Pool::new(2, log.clone())
    });

    let fast = with_connection("fast", |_: &&str| sleep_then(Duration::from_millis(10), "fast"));
    let slow = with_connection("slow", |_: &&str| sleep_then(Duration::from_secs(10), "slow"));

    let error = run(race(vec![fast.boxed(), slow.boxed()]), &registry(&pool))
        .await
        .unwrap_err()
        .into_failure()
        .unwrap();

    assert!(error.failure().is_none());
    assert_eq!(
        error.cleanup_failures()[0].downcast_ref::<PoolError>(),
        Some(&PoolError("slow was poisoned".into()))
    );
    assert_eq!(pool.available(), 2);
}

#[tokio::test(start_paused = true)]
async fn batch_timeout_releases_every_running_item() {
    let log = CallLog::new();
    let pool = Arc::new(Pool::new(3, log.clone()));

    let names = ["a", "b", "c"];
    let effect = partition(vec![0usize, 1, 2], 3, move |i| {
        with_connection(names[i], |_: &&str| sleep_then(Duration::from_secs(30), ()))
    })
    .timeout(Duration::from_secs(1));

    let error = run(effect, &registry(&pool)).await.unwrap_err();

    assert!(error.into_failure().unwrap().is_elapsed());
    assert_eq!(pool.available(), 3);
    assert_eq!(log.count("return a") + log.count("return b") + log.count("return c"), 3);
}
