//! Fail effect - an effect that always fails with the given error.

use std::marker::PhantomData;

use crate::effect::trait_def::Effect;

/// An effect that always fails.
///
/// The success type is free: pick whatever the surrounding composition
/// needs, or [`std::convert::Infallible`] when nothing else constrains it.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let effect = fail::<i32, _, ()>("boom");
/// assert_eq!(effect.execute(&()).await, Err("boom"));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Fail<T, E, Env> {
    error: E,
    _phantom: PhantomData<fn() -> (T, Env)>,
}

impl<T, E, Env> Fail<T, E, Env> {
    /// Create a new Fail effect from an error.
    pub fn new(error: E) -> Self {
        Fail {
            error,
            _phantom: PhantomData,
        }
    }
}

impl<T, E, Env> Effect for Fail<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    type Output = T;
    type Error = E;
    type Env = Env;

    async fn run(self, _env: &Self::Env) -> Result<T, E> {
        Err(self.error)
    }
}
