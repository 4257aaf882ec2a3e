//! Succeed effect - wraps a value as an effect with no side effects.

use std::marker::PhantomData;

use crate::effect::trait_def::Effect;

/// A value wrapped as an Effect.
///
/// Zero-cost: the struct stores only the value plus phantom data for the
/// error and environment types. It requires nothing from a registry.
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let effect = succeed::<_, String, ()>(42);
/// assert_eq!(effect.execute(&()).await, Ok(42));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Succeed<T, E, Env> {
    value: T,
    _phantom: PhantomData<fn() -> (E, Env)>,
}

impl<T, E, Env> Succeed<T, E, Env> {
    /// Create a new Succeed effect from a value.
    pub fn new(value: T) -> Self {
        Succeed {
            value,
            _phantom: PhantomData,
        }
    }
}

impl<T, E, Env> Effect for Succeed<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    type Output = T;
    type Error = E;
    type Env = Env;

    async fn run(self, _env: &Self::Env) -> Result<T, E> {
        Ok(self.value)
    }
}
