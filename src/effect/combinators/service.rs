//! Service access - effects that draw an implementation from the registry.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::effect::trait_def::Effect;
use crate::registry::{self, Capability, Registry, Requirements};

async fn lookup<C: Capability>(registry: &Registry) -> Arc<C::Service> {
    match registry.get::<C>() {
        Some(service) => service,
        // Only reachable when the capability was hidden from the
        // requirement check, e.g. behind a boxed continuation.
        None => registry::missing_at_lookup(C::NAME).await,
    }
}

/// Yields the implementation of capability `C`.
///
/// Requires `C`. The error type is free, so the service can be used in any
/// composition without conversion.
pub struct Service<C, E> {
    _phantom: PhantomData<fn() -> (C, E)>,
}

impl<C, E> Service<C, E> {
    pub(crate) fn new() -> Self {
        Service {
            _phantom: PhantomData,
        }
    }
}

impl<C: Capability, E> std::fmt::Debug for Service<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("capability", &C::NAME)
            .finish()
    }
}

impl<C, E> Effect for Service<C, E>
where
    C: Capability,
    E: Send,
{
    type Output = Arc<C::Service>;
    type Error = E;
    type Env = Registry;

    async fn run(self, env: &Registry) -> Result<Arc<C::Service>, E> {
        Ok(lookup::<C>(env).await)
    }

    fn type_requirements(reqs: &mut Requirements) {
        reqs.insert::<C>();
    }
}

/// Calls an async function with the implementation of capability `C`.
///
/// The usual way to invoke a service method:
///
/// ```rust,ignore
/// with_service::<Storage, _, _>(move |db| async move { db.find(&id).await })
/// ```
pub struct WithService<C, F> {
    pub(crate) f: F,
    pub(crate) _capability: PhantomData<fn() -> C>,
}

impl<C: Capability, F> std::fmt::Debug for WithService<C, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WithService")
            .field("capability", &C::NAME)
            .field("f", &"<function>")
            .finish()
    }
}

impl<C, F, Fut, T, E> Effect for WithService<C, F>
where
    C: Capability,
    F: FnOnce(Arc<C::Service>) -> Fut + Send,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: Send,
{
    type Output = T;
    type Error = E;
    type Env = Registry;

    async fn run(self, env: &Registry) -> Result<T, E> {
        let service = lookup::<C>(env).await;
        (self.f)(service).await
    }

    fn type_requirements(reqs: &mut Requirements) {
        reqs.insert::<C>();
    }
}
