//! Test utilities for orchestration tests
//!
//! Provides recording and failing phase callbacks, a descriptor-driven
//! component factory, and helpers for building test containers.

// Each test crate compiles its own copy; not every crate uses every helper
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::bail;

use lattice::{
    ComponentDescriptor, ComponentFactory, ComponentRef, LifecycleState, Phase, PhaseCallback,
    Registration,
};

/// Shared log of callback invocations, in application order.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<(String, Phase)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str, phase: Phase) {
        self.events
            .lock()
            .expect("recorder lock poisoned")
            .push((name.to_string(), phase));
    }

    pub fn events(&self) -> Vec<(String, Phase)> {
        self.events.lock().expect("recorder lock poisoned").clone()
    }

    /// Component names that received the given phase, in order.
    pub fn names_for(&self, phase: Phase) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(_, recorded)| *recorded == phase)
            .map(|(name, _)| name)
            .collect()
    }

    /// How many times the given component received the given phase.
    pub fn count_for(&self, name: &str, phase: Phase) -> usize {
        self.events()
            .iter()
            .filter(|(recorded_name, recorded)| recorded_name == name && *recorded == phase)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().expect("recorder lock poisoned").clear();
    }
}

/// Callback that records every invocation and always succeeds.
pub struct RecordingCallback {
    recorder: Recorder,
}

impl RecordingCallback {
    pub fn new(recorder: Recorder) -> Self {
        Self { recorder }
    }
}

impl PhaseCallback for RecordingCallback {
    fn apply(
        &self,
        component: &ComponentRef<'_>,
        _from: LifecycleState,
        phase: Phase,
    ) -> anyhow::Result<()> {
        self.recorder.record(component.name, phase);
        Ok(())
    }
}

/// Callback that records every invocation and fails for one (name, phase)
/// pair.
pub struct FailingCallback {
    recorder: Recorder,
    fail_name: String,
    fail_phase: Phase,
}

impl FailingCallback {
    pub fn new(recorder: Recorder, fail_name: impl Into<String>, fail_phase: Phase) -> Self {
        Self {
            recorder,
            fail_name: fail_name.into(),
            fail_phase,
        }
    }
}

impl PhaseCallback for FailingCallback {
    fn apply(
        &self,
        component: &ComponentRef<'_>,
        _from: LifecycleState,
        phase: Phase,
    ) -> anyhow::Result<()> {
        self.recorder.record(component.name, phase);
        if component.name == self.fail_name && phase == self.fail_phase {
            bail!("injected {} failure for component {}", phase, component.name);
        }
        Ok(())
    }
}

/// Factory that turns descriptors into registrations carrying the
/// descriptor's dependency metadata. The instance handle is the descriptor's
/// location string.
pub struct DescriptorFactory;

impl ComponentFactory for DescriptorFactory {
    fn produce(&self, descriptor: &ComponentDescriptor) -> anyhow::Result<Registration> {
        let mut registration = Registration::new(Arc::new(descriptor.location.clone()));
        registration.kinds = descriptor.kinds.clone();
        registration.singleton = descriptor.singleton;
        registration.manifest = descriptor.manifest.clone();
        registration.declared = descriptor.declared.clone();
        Ok(registration)
    }
}

/// Factory that refuses to produce one location.
pub struct FailingFactory {
    fail_location: String,
}

impl FailingFactory {
    pub fn new(fail_location: impl Into<String>) -> Self {
        Self {
            fail_location: fail_location.into(),
        }
    }
}

impl ComponentFactory for FailingFactory {
    fn produce(&self, descriptor: &ComponentDescriptor) -> anyhow::Result<Registration> {
        if descriptor.location == self.fail_location {
            bail!("injected factory failure at {}", descriptor.location);
        }
        DescriptorFactory.produce(descriptor)
    }
}

/// Registration for a plain component instance with the given auto-discovered
/// dependencies.
pub fn component_with_deps(deps: &[&str]) -> Registration {
    Registration::new(Arc::new(())).with_manifest(lattice::DependencyManifest::of(
        deps.iter().map(|dep| dep.to_string()),
    ))
}
