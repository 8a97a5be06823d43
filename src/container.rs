//! The container: one independent orchestration pipeline.
//!
//! Owns the registry, the descriptor model, the phase callbacks, and the
//! materialization session, and drives resolve -> build -> order -> apply
//! for both whole-container phase firing and lazy materialization. All state
//! sits behind one container-wide lock: the pipeline is synchronous on the
//! calling thread, concurrent lazy requests serialize, and readers observe
//! either the fully-old or the fully-new registry state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::graph::builder::{BucketSpec, GraphBuilder};
use crate::graph::order::order;
use crate::graph::resolver::{DependencyResolver, DependencySources};
use crate::lazy::descriptor::{ComponentDescriptor, DescriptorModel};
use crate::lazy::materializer::compute_minimal_set;
use crate::lazy::session::MaterializationSession;
use crate::lifecycle::orchestrator::{CallbackRegistry, LifecycleOrchestrator};
use crate::lifecycle::phase::{LifecycleState, Phase};
use crate::registry::identity::ComponentHandle;
use crate::registry::registry::{ComponentRegistry, Registration};
use crate::traits::{
    ComponentFactory, ConfigDependencyIndex, LatticeError, PhaseCallback, Selector,
    StaticDependencyIndex,
};

/// Options for one lazy-materialization request.
#[derive(Debug, Clone, Copy)]
pub struct MaterializeOptions {
    /// Apply the start phase to the materialized set when the container is
    /// started. When false, components are only initialized.
    pub apply_start: bool,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self { apply_start: true }
    }
}

/// Builds a [`Container`].
pub struct ContainerBuilder {
    name: String,
    descriptors: Vec<ComponentDescriptor>,
    index: Arc<dyn ConfigDependencyIndex>,
    callbacks: CallbackRegistry,
    factory: Option<Arc<dyn ComponentFactory>>,
    bucket_spec: BucketSpec,
    sources: DependencySources,
    lookup_order: Vec<String>,
}

impl ContainerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptors: Vec::new(),
            index: Arc::new(StaticDependencyIndex::new()),
            callbacks: CallbackRegistry::new(),
            factory: None,
            bucket_spec: BucketSpec::single(),
            sources: DependencySources::all(),
            lookup_order: Vec::new(),
        }
    }

    /// Add one descriptor to the structural model.
    pub fn with_descriptor(mut self, descriptor: ComponentDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn with_descriptors<I>(mut self, descriptors: I) -> Self
    where
        I: IntoIterator<Item = ComponentDescriptor>,
    {
        self.descriptors.extend(descriptors);
        self
    }

    /// Use the given structural-configuration dependency index.
    pub fn with_config_index(mut self, index: Arc<dyn ConfigDependencyIndex>) -> Self {
        self.index = index;
        self
    }

    /// Register the phase callback for one component kind.
    pub fn with_callback(mut self, kind: impl Into<String>, callback: Arc<dyn PhaseCallback>) -> Self {
        self.callbacks.insert(kind, callback);
        self
    }

    /// Callback for components whose kinds have no specific registration.
    pub fn with_fallback_callback(mut self, callback: Arc<dyn PhaseCallback>) -> Self {
        self.callbacks.set_fallback(callback);
        self
    }

    /// Factory used to produce instances during lazy materialization.
    pub fn with_factory(mut self, factory: Arc<dyn ComponentFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_bucket_spec(mut self, bucket_spec: BucketSpec) -> Self {
        self.bucket_spec = bucket_spec;
        self
    }

    /// Restrict which dependency sources the resolver consults.
    pub fn with_sources(mut self, sources: DependencySources) -> Self {
        self.sources = sources;
        self
    }

    /// Externally supplied lookup order used for deterministic tie-breaks.
    pub fn with_lookup_order<I, S>(mut self, lookup_order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lookup_order = lookup_order.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Container {
        Container {
            inner: Mutex::new(Inner {
                name: self.name,
                registry: ComponentRegistry::new(),
                model: DescriptorModel::new(self.descriptors),
                index: self.index,
                callbacks: self.callbacks,
                factory: self.factory,
                bucket_spec: self.bucket_spec,
                sources: self.sources,
                lookup_order: self.lookup_order,
                session: MaterializationSession::new(),
                completed: Vec::new(),
                stopped: false,
            }),
        }
    }
}

/// One independent lifecycle-orchestration container.
pub struct Container {
    inner: Mutex<Inner>,
}

struct Inner {
    name: String,
    registry: ComponentRegistry,
    model: DescriptorModel,
    index: Arc<dyn ConfigDependencyIndex>,
    callbacks: CallbackRegistry,
    factory: Option<Arc<dyn ComponentFactory>>,
    bucket_spec: BucketSpec,
    sources: DependencySources,
    lookup_order: Vec<String>,
    session: MaterializationSession,
    /// Build phases the container itself has completed, in firing order
    completed: Vec<Phase>,
    /// Set once a teardown phase fires; registrations are rejected after
    stopped: bool,
}

impl Container {
    pub fn builder(name: impl Into<String>) -> ContainerBuilder {
        ContainerBuilder::new(name)
    }

    /// Register a component and bring it up to the container's current phase.
    pub fn register(
        &self,
        name: impl Into<String>,
        registration: Registration,
    ) -> Result<(), LatticeError> {
        let name = name.into();
        let mut guard = self.inner.lock().expect("container lock poisoned");
        let inner = &mut *guard;
        if inner.stopped {
            return Err(LatticeError::ContainerStopped(name));
        }
        inner.registry.register(name.as_str(), registration)?;

        // Late registrations catch up with the phases already fired
        inner.apply_completed(&name)
    }

    /// Re-apply every build phase the container has completed to one
    /// component. Phases the component already reached are skipped.
    pub fn apply_completed_phases(&self, name: &str) -> Result<(), LatticeError> {
        let mut guard = self.inner.lock().expect("container lock poisoned");
        let inner = &mut *guard;
        if !inner.registry.contains(name) {
            return Err(LatticeError::ComponentNotFound(name.to_string()));
        }
        inner.apply_completed(name)
    }

    /// Tear a component down (stop + dispose, best-effort) and remove it.
    pub fn unregister(&self, name: &str) -> Result<ComponentHandle, LatticeError> {
        let mut guard = self.inner.lock().expect("container lock poisoned");
        let inner = &mut *guard;
        inner
            .teardown_and_unregister(name)
            .ok_or_else(|| LatticeError::ComponentNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<ComponentHandle> {
        self.inner
            .lock()
            .expect("container lock poisoned")
            .registry
            .get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .lock()
            .expect("container lock poisoned")
            .registry
            .contains(name)
    }

    pub fn is_singleton(&self, name: &str) -> bool {
        self.inner
            .lock()
            .expect("container lock poisoned")
            .registry
            .is_singleton(name)
    }

    pub fn state(&self, name: &str) -> Option<LifecycleState> {
        self.inner
            .lock()
            .expect("container lock poisoned")
            .registry
            .state(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("container lock poisoned")
            .registry
            .names()
    }

    /// Names created by the lazy session, in creation order.
    pub fn materialized_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("container lock poisoned")
            .session
            .created()
            .to_vec()
    }

    /// The merged dependency list of one component, for diagnostics.
    pub fn resolve_dependencies(
        &self,
        name: &str,
    ) -> Result<Vec<(String, ComponentHandle)>, LatticeError> {
        let guard = self.inner.lock().expect("container lock poisoned");
        let inner = &*guard;
        let resolver =
            DependencyResolver::new(&inner.registry, inner.index.as_ref(), inner.sources);
        resolver.resolve(name)
    }

    /// Initialize every registered component, dependencies first.
    pub fn initialize(&self) -> Result<(), LatticeError> {
        self.fire_phase(Phase::Initialize)
    }

    /// Start every registered component, dependencies first.
    pub fn start(&self) -> Result<(), LatticeError> {
        self.fire_phase(Phase::Start)
    }

    /// Stop every registered component, dependents first.
    pub fn stop(&self) -> Result<(), LatticeError> {
        self.fire_phase(Phase::Stop)
    }

    /// Dispose every registered component, dependents first.
    pub fn dispose(&self) -> Result<(), LatticeError> {
        self.fire_phase(Phase::Dispose)
    }

    fn fire_phase(&self, phase: Phase) -> Result<(), LatticeError> {
        let mut guard = self.inner.lock().expect("container lock poisoned");
        let inner = &mut *guard;
        let names = inner.registry.names();
        let sequences = inner.build_sequences(&names)?;

        debug!(
            "Firing {} on container '{}' over {} components",
            phase,
            inner.name,
            names.len()
        );
        if phase.is_build() {
            for sequence in &sequences {
                LifecycleOrchestrator::apply_phase(
                    &mut inner.registry,
                    &inner.callbacks,
                    phase,
                    sequence,
                )?;
            }
            if !inner.completed.contains(&phase) {
                inner.completed.push(phase);
            }
        } else {
            // Teardown walks buckets in reverse; apply_phase reverses within
            for sequence in sequences.iter().rev() {
                LifecycleOrchestrator::apply_phase(
                    &mut inner.registry,
                    &inner.callbacks,
                    phase,
                    sequence,
                )?;
            }
            inner.stopped = true;
        }
        Ok(())
    }

    /// Materialize the minimal component set for `selector`.
    pub fn materialize(
        &self,
        selector: &Selector,
    ) -> Result<Vec<(String, ComponentHandle)>, LatticeError> {
        self.materialize_with(selector, MaterializeOptions::default())
    }

    /// Materialize with explicit options.
    ///
    /// Tears down every previously materialized component outside the new
    /// minimal set (reverse creation order), registers and initializes the
    /// new set, and records it as the session baseline. Runs entirely under
    /// the container-wide lock.
    pub fn materialize_with(
        &self,
        selector: &Selector,
        options: MaterializeOptions,
    ) -> Result<Vec<(String, ComponentHandle)>, LatticeError> {
        let mut guard = self.inner.lock().expect("container lock poisoned");
        let inner = &mut *guard;
        inner.materialize(selector, options)
    }

    /// Materialize one more location into the current session without
    /// tearing down the previous set.
    pub fn materialize_additional(
        &self,
        location: &str,
    ) -> Result<Vec<(String, ComponentHandle)>, LatticeError> {
        let mut guard = self.inner.lock().expect("container lock poisoned");
        let inner = &mut *guard;
        inner.materialize_additional(location)
    }
}

impl Inner {
    /// Resolve -> build -> order for the given components, returning one
    /// build-direction sequence per bucket in priority order.
    fn build_sequences(&self, names: &[String]) -> Result<Vec<Vec<String>>, LatticeError> {
        let resolver = DependencyResolver::new(&self.registry, self.index.as_ref(), self.sources);
        let mut builder = GraphBuilder::new(&self.registry, resolver, &self.bucket_spec);
        for name in names {
            builder.add_to_graph(name)?;
        }
        Ok(builder
            .into_graphs()
            .iter()
            .map(|graph| order(graph, &self.lookup_order))
            .collect())
    }

    /// Bring one component up to the container's completed phases.
    fn apply_completed(&mut self, name: &str) -> Result<(), LatticeError> {
        for phase in self.completed.clone() {
            LifecycleOrchestrator::apply_to_component(
                &mut self.registry,
                &self.callbacks,
                phase,
                name,
            )?;
        }
        Ok(())
    }

    /// Stop, dispose, and unregister one component, best-effort.
    fn teardown_and_unregister(&mut self, name: &str) -> Option<ComponentHandle> {
        // Teardown phases never propagate failures
        let _ = LifecycleOrchestrator::apply_to_component(
            &mut self.registry,
            &self.callbacks,
            Phase::Stop,
            name,
        );
        let _ = LifecycleOrchestrator::apply_to_component(
            &mut self.registry,
            &self.callbacks,
            Phase::Dispose,
            name,
        );
        match self.registry.unregister(name) {
            Ok(record) => {
                self.session.forget(name);
                debug!("Unregistered component '{}'", name);
                Some(record.handle)
            }
            Err(_) => None,
        }
    }

    fn materialize(
        &mut self,
        selector: &Selector,
        options: MaterializeOptions,
    ) -> Result<Vec<(String, ComponentHandle)>, LatticeError> {
        if self.factory.is_none() {
            return Err(LatticeError::NoFactory);
        }

        let minimal = compute_minimal_set(&self.model, self.index.as_ref(), selector)?;
        let locations = minimal.member_locations();

        if self.session.satisfies(&locations, options.apply_start) {
            debug!(
                "Materialization request already satisfied by pass {}, reusing current set",
                self.session.pass()
            );
            let current = self
                .session
                .created()
                .iter()
                .filter_map(|name| self.registry.get(name).map(|handle| (name.clone(), handle)))
                .collect();
            return Ok(current);
        }

        // Tear down what the new set no longer needs, newest first
        let keep: HashSet<String> = minimal.registration_names().into_iter().collect();
        let stale: Vec<String> = self
            .session
            .created()
            .iter()
            .rev()
            .filter(|name| !keep.contains(*name))
            .cloned()
            .collect();
        for name in &stale {
            self.teardown_and_unregister(name);
        }

        self.register_planned(&minimal.to_register)?;

        // Baseline in creation order, recorded before lifecycle so a failing
        // build phase still leaves the session accountable for teardown
        let created = self.creation_order(&minimal.registration_names());
        self.session
            .complete_pass(locations, options.apply_start, created);

        let names = minimal.registration_names();
        let sequences = self.build_sequences(&names)?;
        self.apply_session_phases(&sequences, options.apply_start)?;

        info!(
            "Materialized {} components in container '{}' (pass {}, {} stale torn down)",
            names.len(),
            self.name,
            self.session.pass(),
            stale.len()
        );
        Ok(self.collect_ordered(&sequences))
    }

    fn materialize_additional(
        &mut self,
        location: &str,
    ) -> Result<Vec<(String, ComponentHandle)>, LatticeError> {
        if !self.session.is_active() {
            return Err(LatticeError::NoActiveSession);
        }
        if self.factory.is_none() {
            return Err(LatticeError::NoFactory);
        }

        let selector = Selector::target(location);
        let minimal = compute_minimal_set(&self.model, self.index.as_ref(), &selector)?;

        self.register_planned(&minimal.to_register)?;

        let names = minimal.registration_names();
        let created = self.creation_order(&names);
        let apply_start = self.session.apply_start();
        self.session.extend(minimal.member_locations(), created);

        let sequences = self.build_sequences(&names)?;
        self.apply_session_phases(&sequences, apply_start)?;

        debug!(
            "Materialized additional location '{}' into container '{}'",
            location, self.name
        );
        Ok(self.collect_ordered(&sequences))
    }

    /// Produce and register every planned component not already present.
    /// On failure the registrations made here are rolled back so the session
    /// baseline stays accountable for everything registered.
    fn register_planned(
        &mut self,
        planned: &[crate::lazy::materializer::PlannedRegistration],
    ) -> Result<(), LatticeError> {
        let factory = self.factory.clone().expect("factory checked by caller");
        let mut registered: Vec<String> = Vec::new();

        for plan in planned {
            if self.registry.contains(&plan.name) {
                continue;
            }
            let Some(descriptor) = self.model.get(&plan.location).cloned() else {
                continue;
            };
            if plan.orphan {
                debug!("Registering orphan component '{}'", plan.name);
            }
            let result = factory
                .produce(&descriptor)
                .map_err(|source| LatticeError::Factory {
                    location: plan.location.clone(),
                    source,
                })
                .and_then(|registration| self.registry.register(plan.name.as_str(), registration));

            match result {
                Ok(()) => registered.push(plan.name.clone()),
                Err(error) => {
                    for name in registered.iter().rev() {
                        self.teardown_and_unregister(name);
                    }
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    /// Apply the phases the container has completed to the given sequences.
    fn apply_session_phases(
        &mut self,
        sequences: &[Vec<String>],
        apply_start: bool,
    ) -> Result<(), LatticeError> {
        if self.completed.contains(&Phase::Initialize) {
            for sequence in sequences {
                LifecycleOrchestrator::apply_phase(
                    &mut self.registry,
                    &self.callbacks,
                    Phase::Initialize,
                    sequence,
                )?;
            }
        }
        if apply_start && self.completed.contains(&Phase::Start) {
            for sequence in sequences {
                LifecycleOrchestrator::apply_phase(
                    &mut self.registry,
                    &self.callbacks,
                    Phase::Start,
                    sequence,
                )?;
            }
        }
        Ok(())
    }

    /// Registration names sorted by actual creation order.
    fn creation_order(&self, names: &[String]) -> Vec<String> {
        let mut with_seq: Vec<(u64, String)> = names
            .iter()
            .filter_map(|name| {
                self.registry
                    .record(name)
                    .map(|record| (record.seq, name.clone()))
            })
            .collect();
        with_seq.sort();
        with_seq.into_iter().map(|(_, name)| name).collect()
    }

    /// Ordered (name, handle) pairs across buckets in priority order.
    fn collect_ordered(&self, sequences: &[Vec<String>]) -> Vec<(String, ComponentHandle)> {
        let mut ordered = Vec::new();
        for sequence in sequences {
            for name in sequence {
                if let Some(handle) = self.registry.get(name) {
                    ordered.push((name.clone(), handle));
                }
            }
        }
        ordered
    }
}
