//! Constructor functions for creating effects.
//!
//! These functions provide ergonomic ways to create effects without
//! directly constructing the combinator types. None of them performs any
//! work: the value, function or future is only touched when the effect
//! runs.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::effect::combinators::{Fail, FromAsync, FromFn, FromResult, Service, Succeed, WithService};
use crate::registry::Capability;

/// Create an effect that succeeds with `value`.
///
/// Requires nothing and cannot fail in practice; the error type is free
/// so the effect fits any composition.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let effect = succeed::<_, String, ()>(5);
/// assert_eq!(effect.execute(&()).await, Ok(5));
/// # });
/// ```
pub fn succeed<T, E, Env>(value: T) -> Succeed<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    Succeed::new(value)
}

/// Create an effect that always fails with `error`.
pub fn fail<T, E, Env>(error: E) -> Fail<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    Fail::new(error)
}

/// Create an effect from a synchronous function of the environment.
pub fn from_fn<T, E, Env, F>(f: F) -> FromFn<F, Env>
where
    F: FnOnce(&Env) -> Result<T, E> + Send,
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    FromFn::new(f)
}

/// Create an effect from an async function of the environment.
pub fn from_async<T, E, Env, F, Fut>(f: F) -> FromAsync<F, Env>
where
    F: FnOnce(&Env) -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    FromAsync::new(f)
}

/// Lift a `Result` into an effect.
pub fn from_result<T, E, Env>(result: Result<T, E>) -> FromResult<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    FromResult::new(result)
}

/// Lift an `Option` into an effect, failing with `error_fn()` on `None`.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let missing = from_option::<i32, _, ()>(None, || "not found");
/// assert_eq!(missing.execute(&()).await, Err("not found"));
/// # });
/// ```
pub fn from_option<T, E, Env>(
    option: Option<T>,
    error_fn: impl FnOnce() -> E,
) -> FromResult<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    FromResult::new(option.ok_or_else(error_fn))
}

/// Get the implementation of capability `C` from the registry.
///
/// The resulting effect requires `C`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use wellspring::prelude::*;
///
/// struct Prefix;
/// impl Capability for Prefix {
///     const NAME: &'static str = "Prefix";
///     type Service = str;
/// }
///
/// # tokio_test::block_on(async {
/// let registry = Registry::provide::<Prefix>(Arc::from("user-"));
/// let effect = service::<Prefix, String>().map(|p| format!("{p}42"));
/// assert_eq!(run(effect, &registry).await, Ok("user-42".to_string()));
/// # });
/// ```
pub fn service<C, E>() -> Service<C, E>
where
    C: Capability,
    E: Send,
{
    Service::new()
}

/// Call an async function with the implementation of capability `C`.
///
/// The resulting effect requires `C`. Its error type is the future's.
///
/// ```rust
/// use std::sync::Arc;
/// use wellspring::prelude::*;
///
/// trait Counter: Send + Sync {
///     fn next(&self) -> u64;
/// }
///
/// struct Fixed;
/// impl Counter for Fixed {
///     fn next(&self) -> u64 {
///         7
///     }
/// }
///
/// struct Ids;
/// impl Capability for Ids {
///     const NAME: &'static str = "Ids";
///     type Service = dyn Counter;
/// }
///
/// # tokio_test::block_on(async {
/// let registry = Registry::provide::<Ids>(Arc::new(Fixed));
/// let effect = with_service::<Ids, _, _>(|ids| async move { Ok::<_, String>(ids.next()) });
/// assert_eq!(run(effect, &registry).await, Ok(7));
/// # });
/// ```
pub fn with_service<C, F, Fut>(f: F) -> WithService<C, F>
where
    C: Capability,
    F: FnOnce(Arc<C::Service>) -> Fut + Send,
    Fut: Future + Send,
{
    WithService {
        f,
        _capability: PhantomData,
    }
}
