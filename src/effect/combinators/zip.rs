//! Zip combinator - combines two independent effects into a tuple.

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// Combines two effects, running them sequentially and returning both results.
///
/// # Execution Order
///
/// The first effect runs to completion before the second starts. If the
/// first fails, the second never runs.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let effect = succeed::<_, String, ()>(1).zip(succeed(2));
/// assert_eq!(effect.execute(&()).await, Ok((1, 2)));
/// # });
/// ```
pub struct Zip<E1, E2> {
    pub(crate) first: E1,
    pub(crate) second: E2,
}

impl<E1, E2> std::fmt::Debug for Zip<E1, E2> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zip")
            .field("first", &"<effect>")
            .field("second", &"<effect>")
            .finish()
    }
}

impl<E1, E2> Zip<E1, E2> {
    /// Create a new Zip combinator from two effects.
    pub fn new(first: E1, second: E2) -> Self {
        Zip { first, second }
    }
}

impl<E1, E2> Effect for Zip<E1, E2>
where
    E1: Effect,
    E2: Effect<Error = E1::Error, Env = E1::Env>,
{
    type Output = (E1::Output, E2::Output);
    type Error = E1::Error;
    type Env = E1::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let first_result = self.first.run(env).await?;
        let second_result = self.second.run(env).await?;
        Ok((first_result, second_result))
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
