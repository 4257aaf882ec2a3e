//! CatchTag combinator - recovers from exactly one variant of an error union.

use std::marker::PhantomData;

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;
use crate::tagged::Narrow;

/// Routes one error variant `V` to a handler; all others propagate.
///
/// The inner error type must implement [`Narrow<V>`]. When the inner
/// effect fails with `V`, the handler's effect runs in its place. Any other
/// variant is returned as the union's [`Narrow::Rest`], converted into the
/// handler's error type. The resulting error type is therefore the
/// handler's: it drops `V` and adds whatever the handler can fail with.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
/// use wellspring::{error_union, narrow, tagged};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct NotFound { id: String }
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct StorageFailure { reason: String }
///
/// tagged!(NotFound, StorageFailure);
///
/// error_union! {
///     #[derive(Debug, Clone, PartialEq)]
///     enum LookupError {
///         NotFound(NotFound),
///         Storage(StorageFailure),
///     }
/// }
///
/// narrow!(LookupError: NotFound(NotFound) => StorageFailure { Storage });
///
/// # tokio_test::block_on(async {
/// let effect = fail::<String, LookupError, ()>(NotFound { id: "42".into() }.into())
///     .catch_tag(|nf: NotFound| succeed::<_, StorageFailure, ()>(format!("guest-{}", nf.id)));
/// assert_eq!(effect.execute(&()).await, Ok("guest-42".to_string()));
/// # });
/// ```
pub struct CatchTag<Inner, V, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
    pub(crate) _variant: PhantomData<fn() -> V>,
}

impl<Inner, V, F> std::fmt::Debug for CatchTag<Inner, V, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatchTag")
            .field("inner", &"<effect>")
            .field("variant", &std::any::type_name::<V>())
            .field("f", &"<function>")
            .finish()
    }
}

impl<Inner, V, F, E2> Effect for CatchTag<Inner, V, F>
where
    Inner: Effect,
    Inner::Error: Narrow<V>,
    F: FnOnce(V) -> E2 + Send,
    E2: Effect<Output = Inner::Output, Env = Inner::Env>,
    E2::Error: From<<Inner::Error as Narrow<V>>::Rest>,
{
    type Output = Inner::Output;
    type Error = E2::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let error = match self.inner.run(env).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        let handler = match error.narrow() {
            Ok(variant) => (self.f)(variant),
            Err(rest) => return Err(E2::Error::from(rest)),
        };
        handler.run(env).await
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
