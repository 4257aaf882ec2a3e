//! CatchTagWhere combinator - recovers by runtime tag, keeping the error type.

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;
use crate::tagged::Tagged;

/// Routes errors whose [`Tagged::tag`] equals `tag` to a handler.
///
/// Unlike [`CatchTag`](super::CatchTag) the error type does not change:
/// the handler's effect must fail with the same union. Useful for retrying
/// or substituting a value while staying inside one error type.
pub struct CatchTagWhere<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) tag: &'static str,
    pub(crate) f: F,
}

impl<Inner, F> std::fmt::Debug for CatchTagWhere<Inner, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatchTagWhere")
            .field("inner", &"<effect>")
            .field("tag", &self.tag)
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, E2> Effect for CatchTagWhere<Inner, F>
where
    Inner: Effect,
    Inner::Error: Tagged,
    F: FnOnce(Inner::Error) -> E2 + Send,
    E2: Effect<Output = Inner::Output, Error = Inner::Error, Env = Inner::Env>,
{
    type Output = Inner::Output;
    type Error = Inner::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        match self.inner.run(env).await {
            Ok(value) => Ok(value),
            Err(error) if error.tag() == self.tag => (self.f)(error).run(env).await,
            Err(error) => Err(error),
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
