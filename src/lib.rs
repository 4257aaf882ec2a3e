//! # Wellspring
//!
//! > *"Draw only what you declared"*
//!
//! A Rust library for typed effect composition: every operation says what
//! it returns, how it can fail, and which services it needs, and the
//! compiler keeps all three honest as operations are combined.
//!
//! ## Philosophy
//!
//! - **Effects are values**: building one runs nothing; only executing it does
//! - **Errors are closed unions**: composition widens them, handling narrows them
//! - **Dependencies are declared**: a [`Registry`] is checked against an
//!   effect's requirements before anything runs
//!
//! ## Quick Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wellspring::prelude::*;
//! use wellspring::{error_union, narrow, tagged};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct NotFound { id: u32 }
//! #[derive(Debug, Clone, PartialEq)]
//! struct StorageFailure;
//! tagged!(NotFound, StorageFailure);
//!
//! error_union! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     enum LookupError { NotFound(NotFound), Storage(StorageFailure) }
//! }
//! narrow!(LookupError: NotFound(NotFound) => StorageFailure { Storage });
//!
//! trait Users: Send + Sync {
//!     fn name(&self, id: u32) -> Option<String>;
//! }
//!
//! struct Fixed;
//! impl Users for Fixed {
//!     fn name(&self, id: u32) -> Option<String> {
//!         (id == 1).then(|| "ada".to_string())
//!     }
//! }
//!
//! struct Storage;
//! impl Capability for Storage {
//!     const NAME: &'static str = "Storage";
//!     type Service = dyn Users;
//! }
//!
//! fn find(id: u32) -> impl Effect<Output = String, Error = LookupError, Env = Registry> {
//!     with_service::<Storage, _, _>(move |users| async move {
//!         users.name(id).ok_or(LookupError::from(NotFound { id }))
//!     })
//! }
//!
//! # tokio_test::block_on(async {
//! let registry = Registry::provide::<Storage>(Arc::new(Fixed));
//!
//! // Recover from NotFound only; the error type is now just StorageFailure.
//! let effect =
//!     find(7).catch_tag(|_: NotFound| succeed::<_, StorageFailure, _>("guest".to_string()));
//!
//! assert_eq!(run(effect, &registry).await, Ok("guest".to_string()));
//! # });
//! ```
//!
//! ## Modules
//!
//! - [`effect`]: the [`Effect`] trait, constructors and combinators
//! - [`tagged`]: tagged errors and closed unions
//! - [`registry`]: capabilities, registries and requirement checking
//! - [`schedule`]: retry schedules
//! - [`cancel`]: cancellation scopes behind timeout, race and batches
//! - [`batch`]: bounded-concurrency batch execution, as
//!   `for_each(items, concurrency, f)` and `partition(items, concurrency, f)`
//! - [`testing`]: test registries, call logs and assertion macros

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod batch;
pub mod cancel;
pub mod effect;
pub mod registry;
pub mod schedule;
pub mod tagged;
pub mod testing;

// Re-exports
pub use batch::{for_each, partition, BatchFailure, BatchResult, ItemState};
pub use cancel::{CancelScope, CleanupFailure};
pub use effect::{BoxedEffect, Effect, EffectExt, RaceError, ScopeError};
pub use registry::{
    run, Capability, CapabilityId, MissingCapabilities, Prepared, Registry, RegistryError,
    Requirements, RunError,
};
pub use schedule::{JitterStrategy, Schedule, ScheduleError, ScheduleStrategy, TimeoutError};
pub use tagged::{Narrow, Tagged};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batch::{for_each, partition, BatchFailure, BatchResult, ItemState};
    pub use crate::effect::prelude::*;
    pub use crate::registry::{run, Capability, Registry, Requirements, RunError};
    pub use crate::schedule::{Schedule, ScheduleError, TimeoutError};
    pub use crate::tagged::{Narrow, Tagged};
}
