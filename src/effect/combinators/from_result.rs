//! FromResult - lift an already computed `Result` into an effect.

use std::marker::PhantomData;

use crate::effect::trait_def::Effect;

/// Effect that yields a stored `Result`.
#[derive(Debug, Clone)]
pub struct FromResult<T, E, Env> {
    result: Result<T, E>,
    _phantom: PhantomData<fn() -> Env>,
}

impl<T, E, Env> FromResult<T, E, Env> {
    /// Create a new FromResult effect.
    pub fn new(result: Result<T, E>) -> Self {
        FromResult {
            result,
            _phantom: PhantomData,
        }
    }
}

impl<T, E, Env> Effect for FromResult<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    type Output = T;
    type Error = E;
    type Env = Env;

    async fn run(self, _env: &Self::Env) -> Result<T, E> {
        self.result
    }
}
