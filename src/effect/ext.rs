//! Extension trait providing combinator methods for all Effects.
//!
//! The `EffectExt` trait is automatically implemented for all types
//! that implement `Effect`. It provides the combinator methods
//! (`map`, `and_then`, `catch_tag`, `boxed`, ...) that build larger
//! effects out of smaller ones.

use std::marker::PhantomData;
use std::time::Duration;

use crate::effect::boxed::BoxedEffect;
use crate::effect::combinators::{
    AndThen, AndThenWiden, CatchAll, CatchTag, CatchTagWhere, Map, MapErr, Requiring, Tap, Widen,
    Zip, ZipWith,
};
use crate::effect::retry::Timeout;
use crate::effect::trait_def::Effect;
use crate::registry::Capability;
use crate::tagged::{Narrow, Tagged};

/// Extension trait providing combinator methods for all Effects.
///
/// This trait is automatically implemented for all types that implement
/// `Effect`. Every method returns a concrete type, so chains of
/// combinators compile down to nested structs.
pub trait EffectExt: Effect {
    /// Transform the success value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use wellspring::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let effect = succeed::<_, String, ()>(21).map(|x| x * 2);
    /// assert_eq!(effect.execute(&()).await, Ok(42));
    /// # });
    /// ```
    fn map<U, F>(self, f: F) -> Map<Self, F>
    where
        F: FnOnce(Self::Output) -> U + Send,
        U: Send,
    {
        Map { inner: self, f }
    }

    /// Transform the error value.
    fn map_err<E2, F>(self, f: F) -> MapErr<Self, F>
    where
        F: FnOnce(Self::Error) -> E2 + Send,
        E2: Send,
    {
        MapErr { inner: self, f }
    }

    /// Convert the error into a wider union with `Into`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use wellspring::prelude::*;
    /// use wellspring::{error_union, tagged};
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct NotFound;
    /// #[derive(Debug, PartialEq)]
    /// struct StorageFailure;
    /// tagged!(NotFound, StorageFailure);
    ///
    /// error_union! {
    ///     #[derive(Debug, PartialEq)]
    ///     enum UserError { NotFound(NotFound), Storage(StorageFailure) }
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let effect = fail::<(), _, ()>(NotFound).widen::<UserError>();
    /// assert_eq!(effect.execute(&()).await, Err(UserError::NotFound(NotFound)));
    /// # });
    /// ```
    fn widen<E2>(self) -> Widen<Self, E2>
    where
        Self::Error: Into<E2>,
        E2: Send,
    {
        Widen {
            inner: self,
            _marker: PhantomData,
        }
    }

    /// Chain a dependent effect with the same error type.
    ///
    /// The continuation is only called after this effect succeeds. The
    /// requirement set of the result is the union of both stages'.
    fn and_then<E2, F>(self, f: F) -> AndThen<Self, F>
    where
        E2: Effect<Error = Self::Error, Env = Self::Env>,
        F: FnOnce(Self::Output) -> E2 + Send,
    {
        AndThen { inner: self, f }
    }

    /// Chain a dependent effect whose error converts into this effect's.
    ///
    /// Every variant the continuation can fail with survives, converted
    /// into the matching member of `Self::Error`.
    fn and_then_widen<E2, F>(self, f: F) -> AndThenWiden<Self, F, E2>
    where
        F: FnOnce(Self::Output) -> E2 + Send,
        E2: Effect<Env = Self::Env>,
        Self::Error: From<E2::Error>,
    {
        AndThenWiden {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }

    /// Recover from exactly the variant `V`.
    ///
    /// Other variants propagate as the union's [`Narrow::Rest`], converted
    /// into the handler's error type. See
    /// [`CatchTag`](crate::effect::combinators::CatchTag).
    fn catch_tag<V, E2, F>(self, f: F) -> CatchTag<Self, V, F>
    where
        Self::Error: Narrow<V>,
        F: FnOnce(V) -> E2 + Send,
        E2: Effect<Output = Self::Output, Env = Self::Env>,
        E2::Error: From<<Self::Error as Narrow<V>>::Rest>,
    {
        CatchTag {
            inner: self,
            f,
            _variant: PhantomData,
        }
    }

    /// Recover from errors carrying `tag`, staying in the same error type.
    fn catch_tag_where<E2, F>(self, tag: &'static str, f: F) -> CatchTagWhere<Self, F>
    where
        Self::Error: Tagged,
        F: FnOnce(Self::Error) -> E2 + Send,
        E2: Effect<Output = Self::Output, Error = Self::Error, Env = Self::Env>,
    {
        CatchTagWhere { inner: self, tag, f }
    }

    /// Recover from every error. The result fails only as the handler does.
    fn catch_all<E2, F>(self, f: F) -> CatchAll<Self, F>
    where
        E2: Effect<Output = Self::Output, Env = Self::Env>,
        F: FnOnce(Self::Error) -> E2 + Send,
    {
        CatchAll { inner: self, f }
    }

    /// Run a side effect on a reference to the success value, keeping the
    /// value.
    fn tap<E2, F>(self, f: F) -> Tap<Self, F, E2>
    where
        F: FnOnce(&Self::Output) -> E2 + Send,
        E2: Effect<Output = (), Error = Self::Error, Env = Self::Env>,
    {
        Tap {
            inner: self,
            f,
            _marker: PhantomData,
        }
    }

    /// Run this effect, then `other`, and pair their values.
    fn zip<E2>(self, other: E2) -> Zip<Self, E2>
    where
        E2: Effect<Error = Self::Error, Env = Self::Env>,
    {
        Zip::new(self, other)
    }

    /// Run this effect, then `other`, and combine their values.
    fn zip_with<E2, R, F>(self, other: E2, f: F) -> ZipWith<Self, E2, F>
    where
        E2: Effect<Error = Self::Error, Env = Self::Env>,
        F: FnOnce(Self::Output, E2::Output) -> R + Send,
        R: Send,
    {
        ZipWith::new(self, other, f)
    }

    /// Declare that this effect uses capability `C`.
    ///
    /// Needed when a continuation returns a [`BoxedEffect`]: the box does
    /// not exist until the continuation runs, so the registry check cannot
    /// see what it uses.
    fn requiring<C: Capability>(self) -> Requiring<Self, C> {
        Requiring {
            inner: self,
            _capability: PhantomData,
        }
    }

    /// Fail with [`TimeoutError::Elapsed`](crate::schedule::TimeoutError)
    /// if this effect does not finish within `duration`.
    ///
    /// On timeout the effect is cancelled and its scoped resources are
    /// released before the error is returned.
    fn timeout(self, duration: Duration) -> Timeout<Self> {
        Timeout {
            inner: self,
            duration,
        }
    }

    /// Convert this effect into a type-erased boxed effect.
    fn boxed(self) -> BoxedEffect<Self::Output, Self::Error, Self::Env>
    where
        Self: 'static,
        Self::Output: 'static,
        Self::Error: 'static,
        Self::Env: 'static,
    {
        BoxedEffect::new(self)
    }

    /// Run the effect with the given environment.
    ///
    /// For capability-using effects prefer
    /// [`Registry::prepare`](crate::Registry::prepare) or
    /// [`run`](crate::run), which check requirements first.
    ///
    /// # Panics
    ///
    /// When a service lookup finds its capability missing from the
    /// registry. Through `prepare` or `run` that is reported as
    /// [`RunError::Missing`](crate::registry::RunError::Missing) instead.
    #[allow(async_fn_in_trait)]
    async fn execute(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        self.run(env).await
    }
}

// Blanket implementation for all Effect types
impl<E: Effect> EffectExt for E {}
