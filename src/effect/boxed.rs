//! BoxedEffect - type-erased effect for opt-in boxing.
//!
//! Use `BoxedEffect` when you need to:
//! - Store different effect types in a collection
//! - Return different effects from match arms
//! - Create recursive effect functions
//!
//! Boxing clones the environment to achieve `'static` lifetime.
//! [`Registry`](crate::Registry) is an `Arc` internally, so this is cheap.
//!
//! # Requirements
//!
//! A boxed effect's type no longer says which capabilities it uses, so the
//! box records the effect's requirement set when it is built and reports
//! it from [`Effect::requirements`]. Only a boxed effect that does not
//! exist yet, such as one a continuation will return, escapes the check
//! made by [`Registry::prepare`](crate::Registry::prepare). Declare its
//! capabilities with [`EffectExt::requiring`](crate::effect::EffectExt::requiring);
//! an undeclared one that turns out to be missing ends the run with
//! [`RunError::Missing`](crate::registry::RunError::Missing).

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// A pinned, boxed, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased effect.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// fn countdown(n: u32) -> BoxedEffect<u32, String, ()> {
///     if n == 0 {
///         succeed(0).boxed()
///     } else {
///         succeed(n)
///             .and_then(move |x| countdown(x - 1).map(move |rest| x + rest))
///             .boxed()
///     }
/// }
///
/// # tokio_test::block_on(async {
/// assert_eq!(countdown(4).execute(&()).await, Ok(10));
/// # });
/// ```
pub struct BoxedEffect<T, E, Env> {
    // Takes owned Env, cloned from the reference at run time.
    run_fn: Box<dyn FnOnce(Env) -> BoxFuture<'static, Result<T, E>> + Send>,
    requirements: Requirements,
    _phantom: PhantomData<fn() -> Env>,
}

impl<T, E, Env> std::fmt::Debug for BoxedEffect<T, E, Env> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedEffect")
            .field("run_fn", &"<function>")
            .field("requirements", &self.requirements.names())
            .finish()
    }
}

impl<T, E, Env> BoxedEffect<T, E, Env>
where
    T: Send + 'static,
    E: Send + 'static,
    Env: Clone + Send + Sync + 'static,
{
    /// Box an effect.
    pub fn new<Eff>(effect: Eff) -> Self
    where
        Eff: Effect<Output = T, Error = E, Env = Env> + 'static,
    {
        let requirements = Requirements::from_effect(&effect);
        BoxedEffect {
            run_fn: Box::new(move |env: Env| Box::pin(async move { effect.run(&env).await })),
            requirements,
            _phantom: PhantomData,
        }
    }
}

impl<T, E, Env> Effect for BoxedEffect<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    type Output = T;
    type Error = E;
    type Env = Env;

    fn run(self, env: &Env) -> impl Future<Output = Result<T, E>> + Send {
        (self.run_fn)(env.clone())
    }

    fn requirements(&self, reqs: &mut Requirements) {
        reqs.extend(&self.requirements);
    }
}
