//! Phase application across ordered components.
//!
//! Build phases abort on the first callback failure and surface the failing
//! component; teardown phases log failures and keep going, so disposal is
//! never blocked by one failing component. Applying a phase a component has
//! already reached is a no-op.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::lifecycle::phase::Phase;
use crate::registry::registry::ComponentRegistry;
use crate::traits::{ComponentRef, LatticeError, NoopCallback, PhaseCallback};

/// Phase callbacks keyed by component kind.
///
/// A component's first kind with a registered callback wins; components with
/// no matching kind get the no-op callback.
pub struct CallbackRegistry {
    by_kind: HashMap<String, Arc<dyn PhaseCallback>>,
    fallback: Arc<dyn PhaseCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            by_kind: HashMap::new(),
            fallback: Arc::new(NoopCallback),
        }
    }

    /// Register the callback for one component kind.
    pub fn insert(&mut self, kind: impl Into<String>, callback: Arc<dyn PhaseCallback>) {
        self.by_kind.insert(kind.into(), callback);
    }

    /// Replace the callback used for kinds with no registration.
    pub fn set_fallback(&mut self, callback: Arc<dyn PhaseCallback>) {
        self.fallback = callback;
    }

    pub fn for_kinds(&self, kinds: &[String]) -> Arc<dyn PhaseCallback> {
        kinds
            .iter()
            .find_map(|kind| self.by_kind.get(kind))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies one phase to an ordered component sequence.
pub struct LifecycleOrchestrator;

impl LifecycleOrchestrator {
    /// Apply `phase` to the components named by `ordered`.
    ///
    /// `ordered` is the build-direction sequence (dependencies first);
    /// teardown phases consume it reversed. Names no longer registered are
    /// skipped.
    pub fn apply_phase(
        registry: &mut ComponentRegistry,
        callbacks: &CallbackRegistry,
        phase: Phase,
        ordered: &[String],
    ) -> Result<(), LatticeError> {
        let forward = ordered.iter();
        let names: Vec<&String> = if phase.is_build() {
            forward.collect()
        } else {
            forward.rev().collect()
        };

        for name in names {
            Self::apply_to_component(registry, callbacks, phase, name)?;
        }
        Ok(())
    }

    /// Apply `phase` to a single component, honoring the idempotent skip and
    /// the direction-specific failure policy.
    pub fn apply_to_component(
        registry: &mut ComponentRegistry,
        callbacks: &CallbackRegistry,
        phase: Phase,
        name: &str,
    ) -> Result<(), LatticeError> {
        let Some(record) = registry.record(name) else {
            debug!("Component '{}' no longer registered, skipping {}", name, phase);
            return Ok(());
        };

        let from = record.state;
        if from.at_or_past(phase) {
            debug!("Component '{}' already {}, skipping {}", name, from, phase);
            return Ok(());
        }
        if !from.ready_for(phase) {
            debug!(
                "Component '{}' in state {} is not eligible for {}, skipping",
                name, from, phase
            );
            return Ok(());
        }

        let callback = callbacks.for_kinds(&record.kinds);
        let component = ComponentRef {
            name,
            handle: &record.handle,
            kinds: &record.kinds,
        };

        debug!("Applying {} to component '{}'", phase, name);
        match callback.apply(&component, from, phase) {
            Ok(()) => {
                registry.set_state(name, phase.target_state());
                Ok(())
            }
            Err(source) if phase.is_build() => Err(LatticeError::PhaseApplication {
                component: name.to_string(),
                phase,
                source,
            }),
            Err(source) => {
                // Teardown must keep going; the component is considered torn
                // down regardless so the rest of the sequence is attempted.
                warn!(
                    "Error applying {} to component '{}', continuing: {:#}",
                    phase, name, source
                );
                registry.set_state(name, phase.target_state());
                Ok(())
            }
        }
    }
}
