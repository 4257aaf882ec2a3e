//! AndThenWiden combinator - chains an effect whose error widens into ours.

use std::marker::PhantomData;

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// Chains a continuation whose error type converts into the first stage's.
///
/// The continuation's error is converted with `From`, so every variant it
/// can produce is kept as the matching variant of the first stage's union.
pub struct AndThenWiden<Inner, F, E2> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
    pub(crate) _marker: PhantomData<fn() -> E2>,
}

impl<Inner, F, E2> std::fmt::Debug for AndThenWiden<Inner, F, E2> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AndThenWiden")
            .field("inner", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, E2> Effect for AndThenWiden<Inner, F, E2>
where
    Inner: Effect,
    F: FnOnce(Inner::Output) -> E2 + Send,
    E2: Effect<Env = Inner::Env>,
    Inner::Error: From<E2::Error>,
{
    type Output = E2::Output;
    type Error = Inner::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let value = self.inner.run(env).await?;
        (self.f)(value).run(env).await.map_err(Inner::Error::from)
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
