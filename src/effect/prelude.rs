//! Prelude module for convenient imports.
//!
//! Re-exports the effect traits, constructors and combinator types. Most
//! code should use the crate-level [`prelude`](crate::prelude), which adds
//! the registry, schedules and the batch executor on top of this.
//!
//! ```rust
//! use wellspring::effect::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let effect = succeed::<_, String, ()>(42)
//!     .map(|x| x * 2)
//!     .and_then(|x| succeed(x + 1));
//!
//! assert_eq!(effect.execute(&()).await, Ok(85));
//! # });
//! ```

// Traits
pub use crate::effect::ext::EffectExt;
pub use crate::effect::tracing::EffectTracingExt;
pub use crate::effect::trait_def::Effect;

// Boxed Effect
pub use crate::effect::boxed::{BoxFuture, BoxedEffect};

// Combinator Types (usually `impl Effect` suffices)
pub use crate::effect::combinators::{
    AndThen, AndThenWiden, CatchAll, CatchTag, CatchTagWhere, Fail, FromAsync, FromFn, FromResult,
    Map, MapErr, Requiring, Service, Succeed, Tap, Widen, WithService, Zip, ZipWith,
};

// Constructors
pub use crate::effect::constructors::{
    fail, from_async, from_fn, from_option, from_result, service, succeed, with_service,
};

// Scoped resources
pub use crate::effect::scope::{acquire_release, AcquireRelease, ScopeError};

// Retry, timeout, race
pub use crate::effect::race::{race, Race, RaceError};
pub use crate::effect::retry::{retry, retry_while, Retry, Timeout};
