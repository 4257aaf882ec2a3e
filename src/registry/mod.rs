//! Capability registries: binding declared requirements to implementations.
//!
//! A [`Capability`] is a marker type naming an external dependency (storage,
//! cache, logger, ...) and the interface it exposes. A [`Registry`] maps
//! capabilities to concrete implementations. It is assembled once per run
//! (a "live" registry in production, a "test" registry in tests), is
//! immutable afterwards and can be shared by any number of concurrent
//! executions.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wellspring::prelude::*;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self, name: &str) -> String {
//!         format!("hello, {name}")
//!     }
//! }
//!
//! struct Greeting;
//! impl Capability for Greeting {
//!     const NAME: &'static str = "Greeting";
//!     type Service = dyn Greeter;
//! }
//!
//! # tokio_test::block_on(async {
//! let registry = Registry::provide::<Greeting>(Arc::new(English));
//!
//! let effect = service::<Greeting, String>().map(|g| g.greet("ada"));
//! let prepared = registry.prepare(effect).expect("Greeting is provided");
//! assert_eq!(prepared.run().await, Ok("hello, ada".to_string()));
//! # });
//! ```

mod error;
mod requirements;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub use error::{MissingCapabilities, RegistryError, RunError};
pub use requirements::Requirements;

use crate::cancel::CancelScope;
use crate::effect::Effect;

tokio::task_local! {
    static RUN: Arc<RunContext>;
}

/// A named, typed interface describing an external dependency.
///
/// Implement this on a zero-sized marker type. `Service` is usually a trait
/// object (`dyn StorageService`) so that live and test implementations can
/// be swapped without touching the effects that use them.
///
/// ```rust
/// use wellspring::Capability;
///
/// trait Clock: Send + Sync {
///     fn now_millis(&self) -> u64;
/// }
///
/// struct ClockTag;
///
/// impl Capability for ClockTag {
///     const NAME: &'static str = "Clock";
///     type Service = dyn Clock;
/// }
///
/// assert_eq!(ClockTag::NAME, "Clock");
/// ```
pub trait Capability: Send + Sync + 'static {
    /// Name used in diagnostics and error messages.
    const NAME: &'static str;

    /// The interface implementations must provide.
    type Service: ?Sized + Send + Sync + 'static;
}

/// Identity of a capability: its type, plus its name for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityId {
    type_id: TypeId,
    name: &'static str,
}

impl CapabilityId {
    /// The identity of capability `C`.
    pub fn of<C: Capability>() -> Self {
        CapabilityId {
            type_id: TypeId::of::<C>(),
            name: C::NAME,
        }
    }

    /// The capability's diagnostic name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Clone)]
struct Provided {
    id: CapabilityId,
    // Holds an `Arc<C::Service>` for the capability `C` named by `id`.
    service: Arc<dyn Any + Send + Sync>,
}

/// An immutable map from capability to implementation.
///
/// Cloning is cheap: the map itself is shared behind an `Arc`.
///
/// # Merge policy
///
/// [`merge`](Registry::merge) and [`merge_all`](Registry::merge_all) refuse
/// to combine registries that both provide the same capability and report
/// [`RegistryError::DuplicateCapability`]. Shadowing is never silent; to
/// override a capability on purpose (for example a test double layered over
/// a live registry) use [`replace`](Registry::replace), where the last
/// provided implementation wins.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<HashMap<TypeId, Provided>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl Registry {
    /// A registry providing nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry providing exactly one capability.
    pub fn provide<C: Capability>(service: Arc<C::Service>) -> Self {
        let mut entries = HashMap::with_capacity(1);
        entries.insert(TypeId::of::<C>(), Self::entry::<C>(service));
        Registry {
            entries: Arc::new(entries),
        }
    }

    fn entry<C: Capability>(service: Arc<C::Service>) -> Provided {
        Provided {
            id: CapabilityId::of::<C>(),
            service: Arc::new(service),
        }
    }

    /// Union of two registries.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateCapability`] when both registries
    /// provide the same capability.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use wellspring::{Capability, Registry, RegistryError};
    ///
    /// struct Answer;
    /// impl Capability for Answer {
    ///     const NAME: &'static str = "Answer";
    ///     type Service = u32;
    /// }
    ///
    /// let a = Registry::provide::<Answer>(Arc::new(42));
    /// let b = Registry::provide::<Answer>(Arc::new(7));
    /// assert_eq!(
    ///     a.merge(b).unwrap_err(),
    ///     RegistryError::DuplicateCapability { name: "Answer" }
    /// );
    /// ```
    pub fn merge(self, other: Registry) -> Result<Registry, RegistryError> {
        let mut entries = Arc::unwrap_or_clone(self.entries);
        for (type_id, provided) in other.entries.iter() {
            if entries.contains_key(type_id) {
                return Err(RegistryError::DuplicateCapability {
                    name: provided.id.name,
                });
            }
            entries.insert(*type_id, provided.clone());
        }
        Ok(Registry {
            entries: Arc::new(entries),
        })
    }

    /// Union of any number of registries.
    ///
    /// # Errors
    ///
    /// Fails on the first capability provided by more than one registry.
    pub fn merge_all<I>(registries: I) -> Result<Registry, RegistryError>
    where
        I: IntoIterator<Item = Registry>,
    {
        let merged = registries
            .into_iter()
            .try_fold(Registry::empty(), Registry::merge)?;
        tracing::debug!(capabilities = ?merged.capabilities(), "registry assembled");
        Ok(merged)
    }

    /// Provide `C`, replacing any implementation already present.
    ///
    /// This is the explicit last-provided-wins path; `merge` never shadows.
    pub fn replace<C: Capability>(self, service: Arc<C::Service>) -> Registry {
        let mut entries = Arc::unwrap_or_clone(self.entries);
        if entries
            .insert(TypeId::of::<C>(), Self::entry::<C>(service))
            .is_some()
        {
            tracing::debug!(capability = C::NAME, "capability replaced");
        }
        Registry {
            entries: Arc::new(entries),
        }
    }

    /// The implementation of `C`, if provided.
    pub fn get<C: Capability>(&self) -> Option<Arc<C::Service>> {
        self.entries
            .get(&TypeId::of::<C>())
            .and_then(|provided| provided.service.downcast_ref::<Arc<C::Service>>())
            .cloned()
    }

    /// Whether `C` is provided.
    pub fn contains<C: Capability>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<C>())
    }

    pub(crate) fn contains_id(&self, id: &CapabilityId) -> bool {
        self.entries.contains_key(&id.type_id)
    }

    /// Names of all provided capabilities, sorted.
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|p| p.id.name).collect();
        names.sort_unstable();
        names
    }

    /// Number of provided capabilities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry provides nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check an effect's requirements against this registry.
    ///
    /// This is the only gate between building an effect and running it:
    /// if any required capability is missing, nothing runs and the missing
    /// names are reported.
    ///
    /// # Errors
    ///
    /// Returns [`MissingCapabilities`] listing every capability the effect
    /// needs that this registry does not provide.
    pub fn prepare<Eff>(&self, effect: Eff) -> Result<Prepared<'_, Eff>, MissingCapabilities>
    where
        Eff: Effect<Env = Registry>,
    {
        let requirements = Requirements::from_effect(&effect);
        if let Some(missing) = requirements.missing_from(self) {
            tracing::debug!(missing = ?missing.names(), "effect rejected before execution");
            return Err(missing);
        }
        Ok(Prepared {
            effect,
            registry: self,
        })
    }
}

/// An effect whose requirements have been checked against a registry.
///
/// Created by [`Registry::prepare`].
pub struct Prepared<'r, Eff> {
    effect: Eff,
    registry: &'r Registry,
}

impl<Eff> std::fmt::Debug for Prepared<'_, Eff> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prepared")
            .field("effect", &"<effect>")
            .field("registry", self.registry)
            .finish()
    }
}

impl<'r, Eff> Prepared<'r, Eff>
where
    Eff: Effect<Env = Registry>,
{
    /// Execute the effect.
    ///
    /// Returns the success value, or [`RunError::Failed`] with the effect's
    /// typed error. A capability the check could not see (one used by a
    /// boxed effect that a continuation returns) and that the registry
    /// lacks ends the run early: the effect is cancelled, its held
    /// resources are released and [`RunError::Missing`] names the
    /// capability.
    pub async fn run(self) -> Result<Eff::Output, RunError<Eff::Error>> {
        let scope = CancelScope::child_of_current();
        let context = Arc::new(RunContext {
            scope: scope.clone(),
            missing: Mutex::new(Vec::new()),
        });
        let outcome = RUN
            .scope(
                Arc::clone(&context),
                scope.supervise(self.effect.run(self.registry)),
            )
            .await;

        match outcome {
            Some(result) => result.map_err(RunError::Failed),
            None => {
                let missing = context.take_missing();
                if missing.is_empty() {
                    // Cancelled from outside; the canceller drops this future.
                    return std::future::pending().await;
                }
                for failure in scope.take_cleanup_failures() {
                    tracing::error!(%failure, "release failed while abandoning the run");
                }
                Err(RunError::Missing(MissingCapabilities::new(missing)))
            }
        }
    }
}

/// Capabilities found missing while a prepared effect was running.
struct RunContext {
    scope: CancelScope,
    missing: Mutex<Vec<&'static str>>,
}

impl RunContext {
    fn take_missing(&self) -> Vec<&'static str> {
        std::mem::take(&mut *self.missing.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Report a service lookup that found nothing and never resolve.
///
/// Inside [`Prepared::run`] the name is recorded and the run is cancelled,
/// which ends the run with [`RunError::Missing`].
///
/// # Panics
///
/// Outside [`Prepared::run`] there is nothing to report to. That happens
/// only when an effect is started with [`Effect::run`] or `execute`
/// directly, skipping the registry check.
pub(crate) async fn missing_at_lookup<T>(name: &'static str) -> T {
    let reported = RUN.try_with(|run| {
        run.missing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name);
        run.scope.cancel();
    });
    if reported.is_err() {
        panic!(
            "capability `{name}` is not provided by the registry; \
             run the effect through `Registry::prepare` or `run`"
        );
    }
    tracing::error!(capability = name, "capability missing at lookup, cancelling the run");
    std::future::pending().await
}

/// Check requirements, then run.
///
/// Combines [`Registry::prepare`] and [`Prepared::run`]. A requirement
/// mismatch is reported as [`RunError::Missing`] without running anything;
/// a failure of the effect itself as [`RunError::Failed`].
///
/// ```rust
/// use wellspring::prelude::*;
///
/// # tokio_test::block_on(async {
/// let result = run(succeed::<_, String, Registry>(5), &Registry::empty()).await;
/// assert_eq!(result, Ok(5));
/// # });
/// ```
pub async fn run<Eff>(effect: Eff, registry: &Registry) -> Result<Eff::Output, RunError<Eff::Error>>
where
    Eff: Effect<Env = Registry>,
{
    let prepared = registry.prepare(effect).map_err(RunError::Missing)?;
    prepared.run().await
}
