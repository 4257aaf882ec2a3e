//! ZipWith combinator - combines two effects with a function.

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// Runs two effects in order and combines their values with `f`.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let effect = succeed::<_, String, ()>(2).zip_with(succeed(3), |a, b| a * b);
/// assert_eq!(effect.execute(&()).await, Ok(6));
/// # });
/// ```
pub struct ZipWith<E1, E2, F> {
    pub(crate) first: E1,
    pub(crate) second: E2,
    pub(crate) f: F,
}

impl<E1, E2, F> std::fmt::Debug for ZipWith<E1, E2, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipWith")
            .field("first", &"<effect>")
            .field("second", &"<effect>")
            .field("f", &"<function>")
            .finish()
    }
}

impl<E1, E2, F> ZipWith<E1, E2, F> {
    /// Create a new ZipWith combinator.
    pub fn new(first: E1, second: E2, f: F) -> Self {
        ZipWith { first, second, f }
    }
}

impl<E1, E2, F, R> Effect for ZipWith<E1, E2, F>
where
    E1: Effect,
    E2: Effect<Error = E1::Error, Env = E1::Env>,
    F: FnOnce(E1::Output, E2::Output) -> R + Send,
    R: Send,
{
    type Output = R;
    type Error = E1::Error;
    type Env = E1::Env;

    async fn run(self, env: &Self::Env) -> Result<R, Self::Error> {
        let first_result = self.first.run(env).await?;
        let second_result = self.second.run(env).await?;
        Ok((self.f)(first_result, second_result))
    }

    fn requirements(&self, reqs: &mut Requirements) {
        self.first.requirements(reqs);
        self.second.requirements(reqs);
    }

    fn type_requirements(reqs: &mut Requirements) {
        E1::type_requirements(reqs);
        E2::type_requirements(reqs);
    }
}
