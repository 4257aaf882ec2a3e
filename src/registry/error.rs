//! Error types for registry assembly and execution.

/// Error returned while assembling a registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two registries provide the same capability.
    #[error("capability `{name}` is provided more than once")]
    DuplicateCapability {
        /// Name of the capability provided twice.
        name: &'static str,
    },
}

/// An effect needs capabilities the registry does not provide.
///
/// Produced before any part of the effect runs, except for capabilities
/// used by boxed effects that only exist once a continuation returns them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("effect requires capabilities the registry does not provide: {}", .missing.join(", "))]
pub struct MissingCapabilities {
    missing: Vec<&'static str>,
}

impl MissingCapabilities {
    pub(crate) fn new(mut missing: Vec<&'static str>) -> Self {
        missing.sort_unstable();
        missing.dedup();
        MissingCapabilities { missing }
    }

    /// Names of the missing capabilities, sorted.
    pub fn names(&self) -> &[&'static str] {
        &self.missing
    }
}

/// Error returned by [`run`](crate::registry::run).
///
/// Keeps the requirement check and the effect's own failure apart, so the
/// effect's error type stays exactly what it declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError<E> {
    /// The registry lacks capabilities the effect requires.
    ///
    /// Normally reported before anything ran. A capability hidden inside a
    /// boxed continuation is reported when it is looked up, after the
    /// partial run has been cancelled and its resources released.
    Missing(MissingCapabilities),
    /// The effect ran and failed.
    Failed(E),
}

impl<E> RunError<E> {
    /// The effect's own error, if it ran and failed.
    pub fn into_failure(self) -> Option<E> {
        match self {
            RunError::Failed(e) => Some(e),
            RunError::Missing(_) => None,
        }
    }

    /// Returns true if the effect was rejected before running.
    pub fn is_missing(&self) -> bool {
        matches!(self, RunError::Missing(_))
    }
}

impl<E: std::fmt::Display> std::fmt::Display for RunError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Missing(missing) => write!(f, "{}", missing),
            RunError::Failed(e) => write!(f, "effect failed: {}", e),
        }
    }
}

// Display already includes the wrapped error, so `source` skips past it.
impl<E: std::error::Error + 'static> std::error::Error for RunError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Missing(_) => None,
            RunError::Failed(e) => e.source(),
        }
    }
}
