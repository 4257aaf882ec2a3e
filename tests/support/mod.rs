//! A small user service used by the integration tests.
//!
//! Storage, cache and logger are capabilities; the in-memory
//! implementations record every call in a shared `CallLog` and can be told
//! to fail.

#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use wellspring::effect::BoxFuture;
use wellspring::prelude::*;
use wellspring::testing::{CallLog, MockRegistry};
use wellspring::{error_union, narrow, tagged, widen_union};

// ============================================================================
// Domain
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: u32,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotFound {
    pub id: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageFailure {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheFailure {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub field: &'static str,
    pub message: String,
}

tagged!(NotFound, StorageFailure, CacheFailure, ValidationFailure);

error_union! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum FindError {
        NotFound(NotFound),
        Storage(StorageFailure),
    }
}

error_union! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum CreateError {
        Validation(ValidationFailure),
        Storage(StorageFailure),
    }
}

error_union! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum UpdateError {
        NotFound(NotFound),
        Storage(StorageFailure),
        Validation(ValidationFailure),
    }
}

narrow!(FindError: NotFound(NotFound) => StorageFailure { Storage });
widen_union!(FindError => UpdateError { NotFound, Storage });

// ============================================================================
// Capabilities
// ============================================================================

pub trait UserStore: Send + Sync {
    fn find(&self, id: u32) -> BoxFuture<'_, Result<Option<User>, StorageFailure>>;
    fn insert(&self, email: String, name: String) -> BoxFuture<'_, Result<User, StorageFailure>>;
    fn save(&self, user: User) -> BoxFuture<'_, Result<(), StorageFailure>>;
    fn delete(&self, id: u32) -> BoxFuture<'_, Result<bool, StorageFailure>>;
}

pub trait UserCache: Send + Sync {
    fn get(&self, id: u32) -> BoxFuture<'_, Result<Option<User>, CacheFailure>>;
    fn set(&self, user: User) -> BoxFuture<'_, Result<(), CacheFailure>>;
    fn invalidate(&self, id: u32) -> BoxFuture<'_, Result<(), CacheFailure>>;
}

pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
}

pub struct Storage;
impl Capability for Storage {
    const NAME: &'static str = "Storage";
    type Service = dyn UserStore;
}

pub struct Cache;
impl Capability for Cache {
    const NAME: &'static str = "Cache";
    type Service = dyn UserCache;
}

pub struct Log;
impl Capability for Log {
    const NAME: &'static str = "Log";
    type Service = dyn Logger;
}

// ============================================================================
// Service operations
// ============================================================================

pub fn validate_email(email: &str) -> Result<String, ValidationFailure> {
    if email.contains('@') {
        Ok(email.to_string())
    } else {
        Err(ValidationFailure {
            field: "email",
            message: format!("`{email}` is not an email address"),
        })
    }
}

async fn load(store: Arc<dyn UserStore>, id: u32) -> Result<User, FindError> {
    match store.find(id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(FindError::from(NotFound { id })),
        Err(failure) => Err(FindError::from(failure)),
    }
}

/// Cache read that degrades to a miss when the cache is broken.
pub fn read_cache(id: u32) -> impl Effect<Output = Option<User>, Error = Infallible, Env = Registry> {
    with_service::<Cache, _, _>(move |cache| async move { cache.get(id).await }).catch_all(
        |failure: CacheFailure| {
            tracing::warn!(reason = %failure.reason, "cache read failed, treating as miss");
            succeed::<_, Infallible, Registry>(None)
        },
    )
}

pub fn invalidate_cache<E: Send>(id: u32) -> impl Effect<Output = (), Error = E, Env = Registry> {
    with_service::<Cache, _, _>(move |cache| async move { cache.invalidate(id).await })
        .catch_all(|_: CacheFailure| succeed::<_, E, Registry>(()))
}

pub fn log_info<E: Send>(message: String) -> impl Effect<Output = (), Error = E, Env = Registry> {
    with_service::<Log, _, _>(move |logger| async move {
        logger.info(&message);
        Ok::<_, E>(())
    })
}

/// Read-through lookup: cache first, then storage, writing back on a miss.
pub fn find_user(id: u32) -> impl Effect<Output = User, Error = FindError, Env = Registry> {
    read_cache(id)
        .widen::<FindError>()
        .and_then(move |cached| {
            with_service::<Storage, _, _>(move |store| async move {
                match cached {
                    Some(user) => Ok((user, true)),
                    None => load(store, id).await.map(|user| (user, false)),
                }
            })
        })
        .tap(|(user, was_cached)| write_back((!*was_cached).then(|| user.clone())))
        .map(|(user, _)| user)
}

fn write_back(user: Option<User>) -> impl Effect<Output = (), Error = FindError, Env = Registry> {
    with_service::<Cache, _, _>(move |cache| async move {
        match user {
            Some(user) => cache.set(user).await,
            None => Ok(()),
        }
    })
    .catch_all(|failure: CacheFailure| {
        tracing::warn!(reason = %failure.reason, "cache write failed");
        succeed::<_, FindError, Registry>(())
    })
}

pub fn create_user(
    email: String,
    name: String,
) -> impl Effect<Output = User, Error = CreateError, Env = Registry> {
    from_result::<_, _, Registry>(validate_email(&email))
        .widen::<CreateError>()
        .and_then_widen(move |email| {
            with_service::<Storage, _, _>(move |store| async move { store.insert(email, name).await })
        })
        .tap(|user| log_info(format!("created user {}", user.id)))
}

pub fn update_email(
    id: u32,
    email: String,
) -> impl Effect<Output = User, Error = UpdateError, Env = Registry> {
    find_user(id)
        .widen::<UpdateError>()
        .and_then_widen(move |user| {
            from_result::<_, _, Registry>(validate_email(&email))
                .map(move |email| User { email, ..user })
        })
        .and_then_widen(|user| {
            with_service::<Storage, _, _>(move |store| async move {
                store.save(user.clone()).await.map(|()| user)
            })
        })
        .tap(|user| invalidate_cache(user.id))
}

pub fn delete_user(id: u32) -> impl Effect<Output = (), Error = FindError, Env = Registry> {
    with_service::<Storage, _, _>(move |store| async move {
        match store.delete(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(FindError::from(NotFound { id })),
            Err(failure) => Err(FindError::from(failure)),
        }
    })
    .and_then(move |()| invalidate_cache(id))
}

/// The HTTP boundary: every variant maps to exactly one status.
pub fn http_status(error: &UpdateError) -> (u16, String) {
    match error {
        UpdateError::NotFound(e) => (404, format!("user {} not found", e.id)),
        UpdateError::Validation(e) => (400, format!("{}: {}", e.field, e.message)),
        UpdateError::Storage(e) => (503, format!("storage unavailable: {}", e.reason)),
    }
}

// ============================================================================
// In-memory implementations
// ============================================================================

pub struct InMemoryStore {
    users: Mutex<HashMap<u32, User>>,
    next_id: AtomicU32,
    failures_left: AtomicU32,
    log: CallLog,
}

impl InMemoryStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            failures_left: AtomicU32::new(0),
            log,
        }
    }

    pub fn with_user(self, id: u32, email: &str, name: &str) -> Self {
        self.users.lock().unwrap().insert(
            id,
            User {
                id,
                email: email.to_string(),
                name: name.to_string(),
            },
        );
        self.next_id.fetch_max(id + 1, Ordering::SeqCst);
        self
    }

    /// Make the next `n` calls fail.
    pub fn failing(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn user(&self, id: u32) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    fn call(&self, entry: String) -> Result<(), StorageFailure> {
        self.log.record(entry);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(StorageFailure {
                reason: "connection reset".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl UserStore for InMemoryStore {
    fn find(&self, id: u32) -> BoxFuture<'_, Result<Option<User>, StorageFailure>> {
        Box::pin(async move {
            self.call(format!("storage.find {id}"))?;
            Ok(self.user(id))
        })
    }

    fn insert(&self, email: String, name: String) -> BoxFuture<'_, Result<User, StorageFailure>> {
        Box::pin(async move {
            self.call(format!("storage.insert {email}"))?;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let user = User { id, email, name };
            self.users.lock().unwrap().insert(id, user.clone());
            Ok(user)
        })
    }

    fn save(&self, user: User) -> BoxFuture<'_, Result<(), StorageFailure>> {
        Box::pin(async move {
            self.call(format!("storage.save {}", user.id))?;
            self.users.lock().unwrap().insert(user.id, user);
            Ok(())
        })
    }

    fn delete(&self, id: u32) -> BoxFuture<'_, Result<bool, StorageFailure>> {
        Box::pin(async move {
            self.call(format!("storage.delete {id}"))?;
            Ok(self.users.lock().unwrap().remove(&id).is_some())
        })
    }
}

pub struct InMemoryCache {
    entries: Mutex<HashMap<u32, User>>,
    broken: bool,
    log: CallLog,
}

impl InMemoryCache {
    pub fn new(log: CallLog) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            broken: false,
            log,
        }
    }

    pub fn broken(log: CallLog) -> Self {
        Self {
            broken: true,
            ..Self::new(log)
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.lock().unwrap().contains_key(&id)
    }

    fn call(&self, entry: String) -> Result<(), CacheFailure> {
        self.log.record(entry);
        if self.broken {
            Err(CacheFailure {
                reason: "cache offline".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl UserCache for InMemoryCache {
    fn get(&self, id: u32) -> BoxFuture<'_, Result<Option<User>, CacheFailure>> {
        Box::pin(async move {
            self.call(format!("cache.get {id}"))?;
            Ok(self.entries.lock().unwrap().get(&id).cloned())
        })
    }

    fn set(&self, user: User) -> BoxFuture<'_, Result<(), CacheFailure>> {
        Box::pin(async move {
            self.call(format!("cache.set {}", user.id))?;
            self.entries.lock().unwrap().insert(user.id, user);
            Ok(())
        })
    }

    fn invalidate(&self, id: u32) -> BoxFuture<'_, Result<(), CacheFailure>> {
        Box::pin(async move {
            self.call(format!("cache.invalidate {id}"))?;
            self.entries.lock().unwrap().remove(&id);
            Ok(())
        })
    }
}

pub struct RecordingLogger {
    log: CallLog,
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        self.log.record(format!("log.info {message}"));
    }
}

/// Handles on the doubles inside a test registry.
pub struct Fixture {
    pub log: CallLog,
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<InMemoryCache>,
    pub registry: Registry,
}

impl Fixture {
    pub fn new(store: impl FnOnce(CallLog) -> InMemoryStore) -> Self {
        Self::with_cache(store, InMemoryCache::new)
    }

    pub fn with_cache(
        store: impl FnOnce(CallLog) -> InMemoryStore,
        cache: impl FnOnce(CallLog) -> InMemoryCache,
    ) -> Self {
        let log = CallLog::new();
        let store = Arc::new(store(log.clone()));
        let cache = Arc::new(cache(log.clone()));
        let logger: Arc<dyn Logger> = Arc::new(RecordingLogger { log: log.clone() });

        let registry = MockRegistry::new()
            .with::<Storage>(store.clone())
            .with::<Cache>(cache.clone())
            .with::<Log>(logger)
            .build();

        Self {
            log,
            store,
            cache,
            registry,
        }
    }
}

pub fn ada(log: CallLog) -> InMemoryStore {
    InMemoryStore::new(log).with_user(1, "ada@example.com", "Ada")
}
