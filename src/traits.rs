//! Core traits and error types for the orchestration engine.
//!
//! Defines the seams between the engine and the surrounding runtime: phase
//! callbacks, component factories, the structural-configuration dependency
//! index, and lazy-request selectors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::lazy::descriptor::ComponentDescriptor;
use crate::lifecycle::phase::{LifecycleState, Phase};
use crate::registry::identity::ComponentHandle;
use crate::registry::registry::Registration;

/// Borrowed view of a registered component handed to phase callbacks.
pub struct ComponentRef<'a> {
    /// Unique component name
    pub name: &'a str,
    /// The instance handle
    pub handle: &'a ComponentHandle,
    /// Type tags the component was registered with
    pub kinds: &'a [String],
}

impl fmt::Debug for ComponentRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("name", &self.name)
            .field("kinds", &self.kinds)
            .finish()
    }
}

/// Phase callback supplied per component kind by the surrounding runtime.
///
/// Invoked once per component per phase transition. Build-phase failures
/// abort the pass; teardown-phase failures are logged and contained so
/// disposal is never blocked by one failing component.
pub trait PhaseCallback: Send + Sync {
    /// Apply `phase` to `component`, currently in state `from`.
    fn apply(&self, component: &ComponentRef<'_>, from: LifecycleState, phase: Phase)
        -> anyhow::Result<()>;
}

/// Callback that accepts every phase without doing anything.
///
/// Components whose kind has no registered callback get this one.
pub struct NoopCallback;

impl PhaseCallback for NoopCallback {
    fn apply(
        &self,
        _component: &ComponentRef<'_>,
        _from: LifecycleState,
        _phase: Phase,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Produces live component registrations from descriptors during lazy
/// materialization.
pub trait ComponentFactory: Send + Sync {
    /// Build the instance described by `descriptor`.
    fn produce(&self, descriptor: &ComponentDescriptor) -> anyhow::Result<Registration>;
}

/// External structural-configuration index reporting dependencies derived
/// from the artifact's configuration.
pub trait ConfigDependencyIndex: Send + Sync {
    /// Names of the components `name` directly depends on per configuration.
    fn direct_dependencies_of(&self, name: &str) -> Vec<String>;
}

/// In-memory [`ConfigDependencyIndex`] for tests and simple embedders.
#[derive(Debug, Clone, Default)]
pub struct StaticDependencyIndex {
    edges: HashMap<String, Vec<String>>,
}

impl StaticDependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `from` depends on each of `deps`.
    pub fn insert<I, S>(&mut self, from: impl Into<String>, deps: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.edges
            .entry(from.into())
            .or_default()
            .extend(deps.into_iter().map(Into::into));
    }
}

impl ConfigDependencyIndex for StaticDependencyIndex {
    fn direct_dependencies_of(&self, name: &str) -> Vec<String> {
        self.edges.get(name).cloned().unwrap_or_default()
    }
}

/// Selector for a lazy-materialization request: either a predicate over
/// component descriptors or a single location-style target.
#[derive(Clone)]
pub enum Selector {
    /// Materialize every descriptor the predicate accepts
    Predicate(Arc<dyn Fn(&ComponentDescriptor) -> bool + Send + Sync>),
    /// Materialize the descriptor at exactly this location
    Target(String),
}

impl Selector {
    /// Selector matching descriptors by predicate
    pub fn matching<F>(predicate: F) -> Self
    where
        F: Fn(&ComponentDescriptor) -> bool + Send + Sync + 'static,
    {
        Selector::Predicate(Arc::new(predicate))
    }

    /// Selector for a single location-style identifier
    pub fn target(location: impl Into<String>) -> Self {
        Selector::Target(location.into())
    }

    /// Whether the selector accepts the given descriptor
    pub fn accepts(&self, descriptor: &ComponentDescriptor) -> bool {
        match self {
            Selector::Predicate(predicate) => predicate(descriptor),
            Selector::Target(location) => descriptor.location == *location,
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Predicate(_) => f.write_str("Selector::Predicate(..)"),
            Selector::Target(location) => write!(f, "Selector::Target({location})"),
        }
    }
}

/// Orchestration engine errors
#[derive(Debug, Error)]
pub enum LatticeError {
    #[error("missing mandatory dependency '{dependency}' required by '{component}'")]
    MissingDependency {
        component: String,
        dependency: String,
    },

    #[error("dependency declared by '{component}' matched {count} entries for type '{tag}', expected exactly one")]
    AmbiguousDependency {
        component: String,
        tag: String,
        count: usize,
    },

    #[error("{phase} failed for component '{component}'")]
    PhaseApplication {
        component: String,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    #[error("no component found at location '{0}'")]
    TargetNotFound(String),

    #[error("component not found: {0}")]
    ComponentNotFound(String),

    #[error("component already registered: {0}")]
    AlreadyRegistered(String),

    #[error("could not add entry '{0}': container has been stopped")]
    ContainerStopped(String),

    #[error("factory failed to produce component at '{location}'")]
    Factory {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("materialize must complete at least once before requesting additional components")]
    NoActiveSession,

    #[error("no component factory configured for lazy materialization")]
    NoFactory,
}
