//! MapErr combinator - transforms the error of an effect.

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// MapErr combinator - transforms the error value.
///
/// This is the general escape hatch for reshaping an error. Prefer
/// [`widen`](crate::effect::EffectExt::widen) when the target is a union
/// that already has a `From` conversion, since that keeps every variant.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let effect = fail::<i32, _, ()>(404).map_err(|code| format!("status {code}"));
/// assert_eq!(effect.execute(&()).await, Err("status 404".to_string()));
/// # });
/// ```
pub struct MapErr<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

impl<Inner, F> std::fmt::Debug for MapErr<Inner, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapErr")
            .field("inner", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, F, E2> Effect for MapErr<Inner, F>
where
    Inner: Effect,
    F: FnOnce(Inner::Error) -> E2 + Send,
    E2: Send,
{
    type Output = Inner::Output;
    type Error = E2;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, E2> {
        self.inner.run(env).await.map_err(self.f)
    }

    fn requirements(&self, reqs: &mut Requirements) {
        self.inner.requirements(reqs);
    }

    fn type_requirements(reqs: &mut Requirements) {
        Inner::type_requirements(reqs);
    }
}
