//! Map combinator - transforms the success value of an effect.

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// Map combinator - transforms the success value.
///
/// The function is pure: the error type and the requirement set of the
/// inner effect pass through unchanged. Use `and_then` when the
/// transformation itself needs to perform effects.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let effect = succeed::<_, String, ()>(21).map(|x| x * 2);
/// assert_eq!(effect.execute(&()).await, Ok(42));
/// # });
/// ```
pub struct Map<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

impl<Inner, F> std::fmt::Debug for Map<Inner, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map")
            .field("inner", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, U> Effect for Map<Inner, F>
where
    Inner: Effect,
    F: FnOnce(Inner::Output) -> U + Send,
    U: Send,
{
    type Output = U;
    type Error = Inner::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<U, Self::Error> {
        let value = self.inner.run(env).await?;
        Ok((self.f)(value))
    }

    fn requirements(&self, reqs: &mut Requirements) {
        self.inner.requirements(reqs);
    }

    fn type_requirements(reqs: &mut Requirements) {
        Inner::type_requirements(reqs);
    }
}
