//! User Service Example
//!
//! A small user service built from capabilities: storage, cache and an
//! audit log. Demonstrates:
//! - closed error unions and handling errors by tag
//! - assembling registries and the up-front requirement check
//! - retrying a flaky dependency with a schedule
//! - loading many users with the batch executor
//! - mapping every error variant to an HTTP status at the boundary
//!
//! Run with: cargo run --example user_service

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wellspring::effect::BoxFuture;
use wellspring::prelude::*;
use wellspring::{error_union, narrow, tagged, widen_union};

// ============================================================================
// Domain
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct User {
    id: u32,
    email: String,
}

#[derive(Debug, Clone, PartialEq)]
struct NotFound {
    id: u32,
}

#[derive(Debug, Clone, PartialEq)]
struct StorageFailure {
    reason: String,
}

#[derive(Debug, Clone, PartialEq)]
struct InvalidEmail {
    email: String,
}

tagged!(NotFound, StorageFailure, InvalidEmail);

error_union! {
    #[derive(Debug, Clone, PartialEq)]
    enum FindError {
        NotFound(NotFound),
        Storage(StorageFailure),
    }
}

error_union! {
    #[derive(Debug, Clone, PartialEq)]
    enum UpdateError {
        NotFound(NotFound),
        Storage(StorageFailure),
        InvalidEmail(InvalidEmail),
    }
}

narrow!(FindError: NotFound(NotFound) => StorageFailure { Storage });
widen_union!(FindError => UpdateError { NotFound, Storage });

// ============================================================================
// Capabilities
// ============================================================================

trait UserStore: Send + Sync {
    fn find(&self, id: u32) -> BoxFuture<'_, Result<Option<User>, StorageFailure>>;
    fn save(&self, user: User) -> BoxFuture<'_, Result<(), StorageFailure>>;
}

trait AuditLog: Send + Sync {
    fn record(&self, event: String);
}

struct Storage;
impl Capability for Storage {
    const NAME: &'static str = "Storage";
    type Service = dyn UserStore;
}

struct Audit;
impl Capability for Audit {
    const NAME: &'static str = "Audit";
    type Service = dyn AuditLog;
}

// ============================================================================
// Operations
// ============================================================================

fn find_user(id: u32) -> impl Effect<Output = User, Error = FindError, Env = Registry> {
    with_service::<Storage, _, _>(move |store| async move {
        match store.find(id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(FindError::from(NotFound { id })),
            Err(failure) => Err(FindError::from(failure)),
        }
    })
    .instrument(tracing::info_span!("find_user", user_id = id))
}

fn update_email(
    id: u32,
    email: String,
) -> impl Effect<Output = User, Error = UpdateError, Env = Registry> {
    find_user(id)
        .widen::<UpdateError>()
        .and_then_widen(move |user| {
            if email.contains('@') {
                succeed::<_, InvalidEmail, Registry>(User { email, ..user }).boxed()
            } else {
                fail(InvalidEmail { email }).boxed()
            }
        })
        .and_then_widen(|user| {
            with_service::<Storage, _, _>(move |store| async move {
                store.save(user.clone()).await.map(|()| user)
            })
        })
        .tap(|user| {
            let event = format!("user {} changed email to {}", user.id, user.email);
            with_service::<Audit, _, _>(move |audit| async move {
                audit.record(event);
                Ok::<_, UpdateError>(())
            })
        })
}

/// Every variant maps to exactly one response.
fn http_status(error: &UpdateError) -> (u16, String) {
    match error {
        UpdateError::NotFound(e) => (404, format!("user {} not found", e.id)),
        UpdateError::InvalidEmail(e) => (400, format!("`{}` is not an email address", e.email)),
        UpdateError::Storage(e) => (503, format!("storage unavailable: {}", e.reason)),
    }
}

// ============================================================================
// Implementations
// ============================================================================

/// In-memory store that fails its first `flaky` calls.
struct MemoryStore {
    users: Mutex<HashMap<u32, User>>,
    flaky: AtomicU32,
}

impl MemoryStore {
    fn seeded(flaky: u32) -> Self {
        let users = (1..=5)
            .map(|id| {
                (
                    id,
                    User {
                        id,
                        email: format!("user{id}@example.com"),
                    },
                )
            })
            .collect();
        Self {
            users: Mutex::new(users),
            flaky: AtomicU32::new(flaky),
        }
    }

    fn check(&self) -> Result<(), StorageFailure> {
        match self
            .flaky
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(_) => Err(StorageFailure {
                reason: "connection reset".to_string(),
            }),
            Err(_) => Ok(()),
        }
    }

    fn users(&self) -> std::sync::MutexGuard<'_, HashMap<u32, User>> {
        self.users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl UserStore for MemoryStore {
    fn find(&self, id: u32) -> BoxFuture<'_, Result<Option<User>, StorageFailure>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.check()?;
            Ok(self.users().get(&id).cloned())
        })
    }

    fn save(&self, user: User) -> BoxFuture<'_, Result<(), StorageFailure>> {
        Box::pin(async move {
            self.check()?;
            self.users().insert(user.id, user);
            Ok(())
        })
    }
}

struct TracingAudit;

impl AuditLog for TracingAudit {
    fn record(&self, event: String) {
        tracing::info!(target: "audit", "{event}");
    }
}

fn live_registry(flaky: u32) -> Result<Registry, wellspring::RegistryError> {
    let storage = Registry::provide::<Storage>(Arc::new(MemoryStore::seeded(flaky)));
    let audit = Registry::provide::<Audit>(Arc::new(TracingAudit));
    storage.merge(audit)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== User Service ===\n");

    // 1. Happy path
    let registry = live_registry(0)?;
    match run(update_email(1, "ada@example.com".into()), &registry).await {
        Ok(user) => println!("updated: {user:?}"),
        Err(e) => println!("unexpected: {e:?}"),
    }

    // 2. Each failure maps to one status
    println!("\n--- Errors at the boundary ---");
    for (id, email) in [(42, "x@example.com"), (2, "not-an-email")] {
        let result = run(update_email(id, email.into()), &registry).await;
        if let Err(RunError::Failed(error)) = result {
            let (status, message) = http_status(&error);
            println!("{status} {message}");
        }
    }

    // 3. Missing capabilities are caught before anything runs
    println!("\n--- Requirement check ---");
    let storage_only = Registry::provide::<Storage>(Arc::new(MemoryStore::seeded(0)));
    match storage_only.prepare(update_email(1, "a@b.c".into())) {
        Ok(_) => println!("unexpectedly accepted"),
        Err(missing) => println!("rejected: {missing}"),
    }

    // 4. A flaky store, retried with backoff
    println!("\n--- Retry ---");
    let flaky = live_registry(2)?;
    let schedule = Schedule::exponential(Duration::from_millis(10))
        .with_max_retries(3)
        .with_max_delay(Duration::from_millis(100));
    let effect = retry_while(
        || find_user(3),
        schedule,
        |error: &FindError| matches!(error, FindError::Storage(_)),
    )?;
    println!("after retries: {:?}", run(effect, &flaky).await);

    // 5. Batch lookups, at most two at a time
    println!("\n--- Batch ---");
    let batch = partition(vec![1, 2, 9, 4, 11], 2, find_user);
    let result = run(batch, &registry).await?;
    for (id, user) in &result.succeeded {
        println!("found {id}: {}", user.email);
    }
    for (id, error) in &result.failed {
        println!("failed {id}: {}", error.tag());
    }

    // 6. Not found recovered, storage failures left to the caller
    println!("\n--- Recovery ---");
    let guest = find_user(99).catch_tag(|nf: NotFound| {
        succeed::<_, StorageFailure, Registry>(User {
            id: nf.id,
            email: "guest@example.com".into(),
        })
    });
    println!("recovered: {:?}", run(guest, &registry).await);

    Ok(())
}

/* Expected output (log lines omitted):

=== User Service ===

updated: User { id: 1, email: "ada@example.com" }

--- Errors at the boundary ---
404 user 42 not found
400 `not-an-email` is not an email address

--- Requirement check ---
rejected: effect requires capabilities the registry does not provide: Audit

--- Retry ---
after retries: Ok(User { id: 3, email: "user3@example.com" })

--- Batch ---
found 1: user1@example.com
found 2: user2@example.com
found 4: user4@example.com
failed 9: NotFound
failed 11: NotFound

--- Recovery ---
recovered: Ok(User { id: 99, email: "guest@example.com" })

*/
