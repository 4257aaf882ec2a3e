//! Testing utilities for effect-based code.
//!
//! This module provides helpers for testing effects: a builder for test
//! registries, a shared call log for asserting the order in which things
//! happened, assertion macros for effect results, and property-based
//! testing support.
//!
//! # Examples
//!
//! ## MockRegistry Builder
//!
//! ```rust
//! use std::sync::Arc;
//! use wellspring::testing::MockRegistry;
//! use wellspring::Capability;
//!
//! struct Greeting;
//! impl Capability for Greeting {
//!     const NAME: &'static str = "Greeting";
//!     type Service = str;
//! }
//!
//! let registry = MockRegistry::new()
//!     .with::<Greeting>(Arc::from("hello from a test"))
//!     .build();
//!
//! assert!(registry.contains::<Greeting>());
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use wellspring::{assert_fails_with_tag, assert_succeeds, tagged};
//!
//! #[derive(Debug)]
//! struct NotFound;
//! tagged!(NotFound);
//!
//! let ok: Result<i32, NotFound> = Ok(42);
//! assert_succeeds!(ok);
//!
//! let err: Result<i32, NotFound> = Err(NotFound);
//! assert_fails_with_tag!(err, "NotFound");
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use crate::registry::{Capability, Registry};

/// Builder for registries used in tests.
///
/// Each call to [`with`](MockRegistry::with) provides one capability. A
/// later `with` for the same capability replaces the earlier one, so a
/// shared fixture can be specialised per test.
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    registry: Registry,
}

impl MockRegistry {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing registry, e.g. the live one.
    pub fn from_registry(registry: Registry) -> Self {
        Self { registry }
    }

    /// Provide capability `C`, replacing any earlier implementation.
    pub fn with<C: Capability>(self, service: Arc<C::Service>) -> Self {
        Self {
            registry: self.registry.replace::<C>(service),
        }
    }

    /// Build the final registry.
    pub fn build(self) -> Registry {
        self.registry
    }
}

/// A shared, ordered log of events.
///
/// Clones share the same log, so test doubles and effects can record into
/// it while the test keeps a handle to inspect it.
///
/// ```rust
/// use wellspring::testing::CallLog;
///
/// let log = CallLog::new();
/// let handle = log.clone();
/// handle.record("open db");
/// handle.record("close db");
///
/// assert_eq!(log.entries(), vec!["open db", "close db"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.lock().push(entry.into());
    }

    /// A snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Number of entries recorded.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// How many entries equal `entry`.
    pub fn count(&self, entry: &str) -> usize {
        self.lock().iter().filter(|e| *e == entry).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Assert that an effect result is `Ok`, yielding the value.
///
/// ```rust
/// use wellspring::assert_succeeds;
///
/// let value = assert_succeeds!(Ok::<_, String>(42));
/// assert_eq!(value, 42);
/// ```
#[macro_export]
macro_rules! assert_succeeds {
    ($result:expr) => {
        match $result {
            ::core::result::Result::Ok(value) => value,
            ::core::result::Result::Err(e) => {
                panic!("Expected success, got error: {:?}", e);
            }
        }
    };
}

/// Assert that an effect result is `Err`, yielding the error.
#[macro_export]
macro_rules! assert_fails {
    ($result:expr) => {
        match $result {
            ::core::result::Result::Err(e) => e,
            ::core::result::Result::Ok(v) => {
                panic!("Expected failure, got success: {:?}", v);
            }
        }
    };
}

/// Assert that an effect result failed with the given tag, yielding the
/// error.
///
/// The error type must implement [`Tagged`](crate::Tagged).
#[macro_export]
macro_rules! assert_fails_with_tag {
    ($result:expr, $tag:expr) => {
        match $result {
            ::core::result::Result::Err(e) => {
                let actual = $crate::Tagged::tag(&e);
                assert_eq!(
                    actual, $tag,
                    "Expected failure tagged {:?}, got {:?}",
                    $tag, actual
                );
                e
            }
            ::core::result::Result::Ok(v) => {
                panic!("Expected failure tagged {:?}, got success: {:?}", $tag, v);
            }
        }
    };
}

#[cfg(feature = "proptest")]
mod strategies {
    use std::time::Duration;

    use proptest::prelude::*;

    use crate::schedule::Schedule;

    fn delay() -> impl Strategy<Value = Duration> {
        (0u64..10_000).prop_map(Duration::from_millis)
    }

    impl Arbitrary for Schedule {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        /// Bounded schedules of every strategy, with and without caps.
        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            let base = prop_oneof![
                (0u32..20).prop_map(Schedule::recurs),
                delay().prop_map(Schedule::constant),
                delay().prop_map(Schedule::linear),
                delay().prop_map(Schedule::exponential),
                delay().prop_map(Schedule::fibonacci),
            ];
            (base, 0u32..20, proptest::option::of(delay()))
                .prop_map(|(schedule, retries, cap)| {
                    let schedule = schedule.with_max_retries(retries);
                    match cap {
                        Some(cap) => schedule.with_max_delay(cap),
                        None => schedule,
                    }
                })
                .boxed()
        }
    }
}
