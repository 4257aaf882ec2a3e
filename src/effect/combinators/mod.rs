//! Zero-cost combinator types for effect composition.
//!
//! This module contains the concrete types returned by effect combinators.
//! They don't allocate on the heap and each one forwards the requirement
//! sets of the effects it contains, so a composed effect's requirements are
//! known before it runs.
//!
//! Most users won't need to work with these types directly. Instead,
//! use the combinator methods on `EffectExt` which return these types
//! behind `impl Effect<...>`.

mod and_then;
mod and_then_widen;
mod catch_all;
mod catch_tag;
mod catch_tag_where;
mod fail;
mod from_async;
mod from_fn;
mod from_result;
mod map;
mod map_err;
mod require;
mod service;
mod succeed;
mod tap;
mod widen;
mod zip;
mod zip_with;

pub use and_then::AndThen;
pub use and_then_widen::AndThenWiden;
pub use catch_all::CatchAll;
pub use catch_tag::CatchTag;
pub use catch_tag_where::CatchTagWhere;
pub use fail::Fail;
pub use from_async::FromAsync;
pub use from_fn::FromFn;
pub use from_result::FromResult;
pub use map::Map;
pub use map_err::MapErr;
pub use require::Requiring;
pub use service::{Service, WithService};
pub use succeed::Succeed;
pub use tap::Tap;
pub use widen::Widen;
pub use zip::Zip;
pub use zip_with::ZipWith;
