//! Effect values: typed descriptions of work that has not run yet.
//!
//! An effect is a value implementing [`Effect`]. Its type records three
//! things:
//!
//! - `Output`, what it produces on success,
//! - `Error`, the closed set of ways it can fail,
//! - its capability requirements, read from the type through
//!   [`Effect::requirements`].
//!
//! Building an effect never performs any work. Combinators return concrete
//! nested structs, so the compiler can inline whole chains:
//!
//! ```rust
//! use wellspring::prelude::*;
//!
//! # tokio_test::block_on(async {
//! // Map<AndThen<Succeed<..>, ..>, ..>, no heap allocation
//! let effect = succeed::<_, String, ()>(20)
//!     .and_then(|x| succeed(x + 1))
//!     .map(|x| x * 2);
//!
//! assert_eq!(effect.execute(&()).await, Ok(42));
//! # });
//! ```
//!
//! # Errors compose as unions
//!
//! Sequencing effects with different error types does not erase them.
//! Declare a union with [`error_union!`](crate::error_union) and convert
//! each stage into it with [`widen`](EffectExt::widen) or
//! [`and_then_widen`](EffectExt::and_then_widen). Recovery narrows the
//! union again: [`catch_tag`](EffectExt::catch_tag) removes exactly one
//! variant, [`catch_all`](EffectExt::catch_all) removes all of them.
//!
//! # When to box
//!
//! [`BoxedEffect`] erases the concrete type. It is needed for collections
//! of different effects, recursion, and match arms returning different
//! effect types. A boxed effect's requirements are hidden by the erasure;
//! declare them with [`requiring`](EffectExt::requiring).

pub mod boxed;
pub mod combinators;
pub mod constructors;
pub mod ext;
pub mod prelude;
pub mod race;
pub mod retry;
pub mod scope;
pub mod tracing;
mod trait_def;

pub use trait_def::Effect;

pub use ext::EffectExt;

pub use boxed::{BoxFuture, BoxedEffect};

pub use combinators::{
    AndThen, AndThenWiden, CatchAll, CatchTag, CatchTagWhere, Fail, FromAsync, FromFn, FromResult,
    Map, MapErr, Requiring, Service, Succeed, Tap, Widen, WithService, Zip, ZipWith,
};

pub use constructors::{
    fail, from_async, from_fn, from_option, from_result, service, succeed, with_service,
};

pub use scope::{acquire_release, AcquireRelease, ScopeError};

pub use retry::{retry, retry_while, Retry, Timeout};

pub use race::{race, Race, RaceError};

pub use self::tracing::{EffectTracingExt, Instrument};
