//! Requiring combinator - declares a capability the registry check cannot see.

use std::marker::PhantomData;

use crate::effect::trait_def::Effect;
use crate::registry::{Capability, Requirements};

/// Adds capability `C` to the requirement set of the inner effect.
///
/// Continuations contribute the requirements of the effect type they
/// return. When that type is a [`BoxedEffect`](crate::effect::BoxedEffect)
/// (recursion, match arms of different types) it says nothing, so the
/// surrounding effect must declare what the box uses. Otherwise a registry
/// lacking the capability is only detected when the lookup runs, and the
/// run ends with [`RunError::Missing`](crate::registry::RunError::Missing)
/// after partial work.
pub struct Requiring<Inner, C> {
    pub(crate) inner: Inner,
    pub(crate) _capability: PhantomData<fn() -> C>,
}

impl<Inner, C: Capability> std::fmt::Debug for Requiring<Inner, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requiring")
            .field("inner", &"<effect>")
            .field("capability", &C::NAME)
            .finish()
    }
}

impl<Inner, C> Effect for Requiring<Inner, C>
where
    Inner: Effect,
    C: Capability,
{
    type Output = Inner::Output;
    type Error = Inner::Error;
    type Env = Inner::Env;

    fn run(
        self,
        env: &Self::Env,
    ) -> impl std::future::Future<Output = Result<Self::Output, Self::Error>> + Send {
        self.inner.run(env)
    }

    fn requirements(&self, reqs: &mut Requirements) {
        self.inner.requirements(reqs);
        reqs.insert::<C>();
    }

    fn type_requirements(reqs: &mut Requirements) {
        Inner::type_requirements(reqs);
        reqs.insert::<C>();
    }
}
