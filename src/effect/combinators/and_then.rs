//! AndThen combinator - chains dependent effects.

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// AndThen combinator - chains dependent effects.
///
/// The first effect runs to completion before the continuation is even
/// built. On failure the continuation is never called. The requirement set
/// is the union of the first effect's and the continuation effect's.
///
/// The error type of the chained effect must match the error type of the
/// original effect. When the stages fail differently, widen the first
/// stage into a union and use
/// [`and_then_widen`](crate::effect::EffectExt::and_then_widen):
///
/// ```rust,ignore
/// find_user(id)                              // Error = NotFound
///     .widen::<UserError>()                  // Error = UserError
///     .and_then_widen(|user| save(user))     // save: Error = StorageFailure
/// ```
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let effect = succeed::<_, String, ()>(21).and_then(|x| succeed(x * 2));
/// assert_eq!(effect.execute(&()).await, Ok(42));
/// # });
/// ```
pub struct AndThen<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

impl<Inner, F> std::fmt::Debug for AndThen<Inner, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AndThen")
            .field("inner", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, E2> Effect for AndThen<Inner, F>
where
    Inner: Effect,
    E2: Effect<Error = Inner::Error, Env = Inner::Env>,
    F: FnOnce(Inner::Output) -> E2 + Send,
{
    type Output = E2::Output;
    type Error = Inner::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let value = self.inner.run(env).await?;
        (self.f)(value).run(env).await
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
