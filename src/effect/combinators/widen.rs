//! Widen combinator - converts an effect's error into a wider union.

use std::marker::PhantomData;

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// Converts the error into `E2` with `Into`.
///
/// Used to lift a single variant (or a narrow union) into the union a
/// composition works in. Nothing is lost: the variant survives as the
/// matching member of `E2`.
pub struct Widen<Inner, E2> {
    pub(crate) inner: Inner,
    pub(crate) _marker: PhantomData<fn() -> E2>,
}

impl<Inner, E2> std::fmt::Debug for Widen<Inner, E2> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widen")
            .field("inner", &"<effect>")
            .field("into", &std::any::type_name::<E2>())
            .finish()
    }
}

impl<Inner, E2> Effect for Widen<Inner, E2>
where
    Inner: Effect,
    Inner::Error: Into<E2>,
    E2: Send,
{
    type Output = Inner::Output;
    type Error = E2;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, E2> {
        self.inner.run(env).await.map_err(Into::into)
    }

    fn requirements(&self, reqs: &mut Requirements) {
        self.inner.requirements(reqs);
    }

    fn type_requirements(reqs: &mut Requirements) {
        Inner::type_requirements(reqs);
    }
}
