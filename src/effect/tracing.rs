//! Tracing support for effects.
//!
//! This module provides the `Instrument` combinator and `instrument` method
//! for wrapping effects in tracing spans.

use crate::effect::trait_def::Effect;
use crate::registry::Requirements;

/// Runs the inner effect inside a tracing span.
#[derive(Debug)]
pub struct Instrument<E> {
    pub(crate) inner: E,
    pub(crate) span: tracing::Span,
}

impl<E> Effect for Instrument<E>
where
    E: Effect,
{
    type Output = E::Output;
    type Error = E::Error;
    type Env = E::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        use tracing::Instrument as _;
        self.inner.run(env).instrument(self.span).await
    }

    fn requirements(&self, reqs: &mut Requirements) {
        self.inner.requirements(reqs);
    }

    fn type_requirements(reqs: &mut Requirements) {
        E::type_requirements(reqs);
    }
}

/// Extension trait adding [`instrument`](EffectTracingExt::instrument).
pub trait EffectTracingExt: Effect {
    /// Wrap this effect in `span`.
    ///
    /// ```rust
    /// use wellspring::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let effect = succeed::<_, String, ()>(42).instrument(tracing::info_span!("lookup"));
    /// assert_eq!(effect.execute(&()).await, Ok(42));
    /// # });
    /// ```
    fn instrument(self, span: tracing::Span) -> Instrument<Self> {
        Instrument { inner: self, span }
    }
}

impl<E: Effect> EffectTracingExt for E {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::constructors::{fail, succeed};
    use crate::effect::ext::EffectExt;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_instrument_returns_value() {
        let effect = succeed::<_, String, ()>(42).instrument(tracing::info_span!("test_span"));
        assert_eq!(effect.execute(&()).await, Ok(42));
    }

    #[tokio::test]
    async fn test_error_in_span_propagates() {
        let effect =
            fail::<i32, _, ()>("oops".to_string()).instrument(tracing::info_span!("failing"));
        assert_eq!(effect.execute(&()).await, Err("oops".to_string()));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_events_inside_span_carry_it() {
        let effect = succeed::<_, String, ()>(5)
            .tap(|value| {
                tracing::info!(value, "inside");
                succeed(())
            })
            .instrument(tracing::info_span!("load_user", user_id = 7));

        assert_eq!(effect.execute(&()).await, Ok(5));
        assert!(logs_contain("load_user"));
        assert!(logs_contain("inside"));
    }
}
