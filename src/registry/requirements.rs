//! Requirement sets of effects.

use std::any::TypeId;
use std::collections::HashMap;

use super::{Capability, CapabilityId, MissingCapabilities, Registry};
use crate::effect::Effect;

/// The set of capabilities an effect needs from its registry.
///
/// Usually obtained with [`Requirements::from_effect`], which walks a built
/// effect, or [`Requirements::of`], which walks an effect type.
///
/// ```rust
/// use std::sync::Arc;
/// use wellspring::prelude::*;
///
/// struct Storage;
/// impl Capability for Storage {
///     const NAME: &'static str = "Storage";
///     type Service = String;
/// }
///
/// struct Cache;
/// impl Capability for Cache {
///     const NAME: &'static str = "Cache";
///     type Service = String;
/// }
///
/// fn both() -> impl Effect<Output = usize, Error = String, Env = Registry> {
///     service::<Storage, String>()
///         .and_then(|db| service::<Cache, String>().map(move |c| db.len() + c.len()))
/// }
///
/// let reqs = Requirements::from_effect(&both());
/// assert_eq!(reqs.names(), vec!["Cache", "Storage"]);
///
/// // Boxing keeps what the effect needs.
/// let boxed = service::<Storage, String>().map(|db| db.len()).boxed();
/// assert_eq!(Requirements::from_effect(&boxed).names(), vec!["Storage"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    ids: HashMap<TypeId, CapabilityId>,
}

impl Requirements {
    /// An empty requirement set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The requirement set of `effect`.
    pub fn from_effect<Eff: Effect>(effect: &Eff) -> Self {
        let mut reqs = Self::new();
        effect.requirements(&mut reqs);
        reqs
    }

    /// The requirement set shared by every value of effect type `Eff`.
    ///
    /// Boxed effects inside `Eff` contribute nothing; prefer
    /// [`from_effect`](Self::from_effect) when a value is at hand.
    pub fn of<Eff: Effect>() -> Self {
        let mut reqs = Self::new();
        Eff::type_requirements(&mut reqs);
        reqs
    }

    /// Add every capability in `other`.
    pub fn extend(&mut self, other: &Requirements) {
        self.ids
            .extend(other.ids.iter().map(|(type_id, id)| (*type_id, *id)));
    }

    /// Add capability `C`.
    pub fn insert<C: Capability>(&mut self) {
        let id = CapabilityId::of::<C>();
        self.ids.insert(id.type_id, id);
    }

    /// Whether `C` is required.
    pub fn contains<C: Capability>(&self) -> bool {
        self.ids.contains_key(&TypeId::of::<C>())
    }

    /// Required capability names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.ids.values().map(CapabilityId::name).collect();
        names.sort_unstable();
        names
    }

    /// Number of required capabilities.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is required.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The capabilities `registry` does not provide, or `None` if this set
    /// is a subset of what it provides.
    pub fn missing_from(&self, registry: &Registry) -> Option<MissingCapabilities> {
        let missing: Vec<_> = self
            .ids
            .values()
            .filter(|id| !registry.contains_id(id))
            .map(CapabilityId::name)
            .collect();
        if missing.is_empty() {
            None
        } else {
            Some(MissingCapabilities::new(missing))
        }
    }
}
