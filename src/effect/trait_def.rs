//! Effect trait definition - the core abstraction for typed effects.
//!
//! An effect describes a computation that:
//! - Produces a value of type `Output` on success
//! - May fail with an error of type `Error` (a closed union of tagged variants)
//! - Depends on an environment of type `Env`
//! - Requires a set of capabilities, known before it runs
//!
//! Building and composing an effect never performs I/O. The work happens
//! only when [`Effect::run`] is called, normally through
//! [`Registry::prepare`](crate::registry::Registry::prepare).
//!
//! # Environment Cloning
//!
//! The `Env` type requires `Clone` to enable boxing. When an effect is boxed,
//! the environment is cloned into the boxed future to achieve a `'static`
//! lifetime. [`Registry`](crate::Registry) is an `Arc` internally, so the
//! clone is a reference-count bump.

use std::future::Future;

use crate::registry::Requirements;

/// The core Effect trait - represents a deferred computation.
///
/// Combinators return concrete types (like `Future` and `Iterator`), so a
/// composed effect is a plain nested struct with no heap allocation. Use
/// [`EffectExt::boxed`](crate::effect::EffectExt::boxed) when type erasure
/// is needed.
///
/// # Type Parameters
///
/// * `Output` - The success type produced by this effect
/// * `Error` - The error type that may be produced
/// * `Env` - The environment required to run this effect
///
/// # Example
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let effect = succeed::<_, String, ()>(20).map(|x| x + 1).map(|x| x * 2);
/// assert_eq!(effect.execute(&()).await, Ok(42));
/// # });
/// ```
pub trait Effect: Sized + Send {
    /// The success type produced by this effect.
    type Output: Send;

    /// The error type that may be produced.
    type Error: Send;

    /// The environment type required to run this effect.
    type Env: Clone + Send + Sync;

    /// Execute this effect with the given environment.
    ///
    /// The returned future produces `Ok(output)` on success or
    /// `Err(error)` on failure.
    fn run(self, env: &Self::Env)
        -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;

    /// Record the capabilities this effect draws from a
    /// [`Registry`](crate::Registry).
    ///
    /// Combinators forward to the effects they hold and to the effect
    /// types their continuations return, so the full requirement set of a
    /// composed effect is known before anything runs. A
    /// [`BoxedEffect`](crate::effect::BoxedEffect) answers with the set it
    /// captured when it was boxed.
    fn requirements(&self, reqs: &mut Requirements) {
        Self::type_requirements(reqs);
    }

    /// Record the capabilities every value of this effect type draws.
    ///
    /// Used for effects that do not exist yet, such as the effect a
    /// continuation will return. Type-erased effects contribute nothing
    /// here; their capabilities are checked when they are looked up.
    fn type_requirements(_reqs: &mut Requirements) {}
}
