//! Tap combinator - runs a side effect on the success value.

use std::marker::PhantomData;

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// Runs an effect built from a reference to the success value, then
/// returns the original value.
///
/// The tapped effect shares the error type, so its failures are not
/// ignored. Typical use is logging through a logger capability.
pub struct Tap<Inner, F, E2> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
    pub(crate) _marker: PhantomData<fn() -> E2>,
}

impl<Inner, F, E2> std::fmt::Debug for Tap<Inner, F, E2> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tap")
            .field("inner", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, E2> Effect for Tap<Inner, F, E2>
where
    Inner: Effect,
    F: FnOnce(&Inner::Output) -> E2 + Send,
    E2: Effect<Output = (), Error = Inner::Error, Env = Inner::Env>,
{
    type Output = Inner::Output;
    type Error = Inner::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let value = self.inner.run(env).await?;
        let side = (self.f)(&value);
        side.run(env).await?;
        Ok(value)
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
