//! CatchAll combinator - recovers from every error.

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// Routes every error to a handler.
///
/// The resulting error type is exactly the handler effect's error type.
/// A handler that cannot fail (`Error = Infallible`) turns the whole
/// effect into one that cannot fail.
///
/// # Example
///
/// ```rust
/// use std::convert::Infallible;
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let effect = fail::<i32, _, ()>("cache down")
///     .catch_all(|_| succeed::<_, Infallible, ()>(0));
/// assert_eq!(effect.execute(&()).await, Ok(0));
/// # });
/// ```
pub struct CatchAll<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

impl<Inner, F> std::fmt::Debug for CatchAll<Inner, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatchAll")
            .field("inner", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, E2> Effect for CatchAll<Inner, F>
where
    Inner: Effect,
    E2: Effect<Output = Inner::Output, Env = Inner::Env>,
    F: FnOnce(Inner::Error) -> E2 + Send,
{
    type Output = Inner::Output;
    type Error = E2::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        match self.inner.run(env).await {
            Ok(value) => Ok(value),
            Err(e) => (self.f)(e).run(env).await,
        }
    }

    fn requirements(&self, reqs: &mut Requirements) {
        self.inner.requirements(reqs);
        E2::type_requirements(reqs);
    }

    fn type_requirements(reqs: &mut Requirements) {
        Inner::type_requirements(reqs);
        E2::type_requirements(reqs);
    }
}
