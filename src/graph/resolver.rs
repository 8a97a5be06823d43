//! Dependency resolution.
//!
//! Merges the three dependency sources of a component into one ordered,
//! de-duplicated list. The merge order is fixed so tie-breaking downstream is
//! reproducible: auto-discovered first, then configuration-derived, then
//! declared. Cycles are not detected here; the graph builder handles them.

use bitflags::bitflags;
use tracing::debug;

use crate::registry::identity::ComponentHandle;
use crate::registry::manifest::DeclaredDependency;
use crate::registry::registry::ComponentRegistry;
use crate::traits::{ConfigDependencyIndex, LatticeError};

bitflags! {
    /// Which dependency sources participate in resolution.
    ///
    /// The engine ships one resolver parameterized by this value instead of
    /// parallel resolver implementations per source combination.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DependencySources: u8 {
        /// Injection metadata attached at registration
        const AUTO_DISCOVERED = 0b001;
        /// The external structural-configuration index
        const CONFIGURATION = 0b010;
        /// Programmatic declarations on the component
        const DECLARED = 0b100;
    }
}

impl Default for DependencySources {
    fn default() -> Self {
        DependencySources::all()
    }
}

/// Resolves the merged dependency list of one component.
pub struct DependencyResolver<'a> {
    registry: &'a ComponentRegistry,
    index: &'a dyn ConfigDependencyIndex,
    sources: DependencySources,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        registry: &'a ComponentRegistry,
        index: &'a dyn ConfigDependencyIndex,
        sources: DependencySources,
    ) -> Self {
        Self {
            registry,
            index,
            sources,
        }
    }

    /// Ordered set of (name, instance) pairs `name` depends on.
    ///
    /// Dependencies naming unregistered components are skipped, except for
    /// required single-valued declarations, which fail resolution.
    pub fn resolve(&self, name: &str) -> Result<Vec<(String, ComponentHandle)>, LatticeError> {
        let mut merged: Vec<(String, ComponentHandle)> = Vec::new();

        if self.sources.contains(DependencySources::AUTO_DISCOVERED) {
            if let Some(record) = self.registry.record(name) {
                for dependency in record.manifest.injected.clone() {
                    self.push_registered(&mut merged, name, &dependency);
                }
            }
        }

        if self.sources.contains(DependencySources::CONFIGURATION) {
            for dependency in self.index.direct_dependencies_of(name) {
                self.push_registered(&mut merged, name, &dependency);
            }
        }

        if self.sources.contains(DependencySources::DECLARED) {
            let declared = self
                .registry
                .record(name)
                .map(|record| record.declared.clone())
                .unwrap_or_default();
            for declaration in declared {
                self.resolve_declared(&mut merged, name, &declaration)?;
            }
        }

        Ok(merged)
    }

    fn resolve_declared(
        &self,
        merged: &mut Vec<(String, ComponentHandle)>,
        component: &str,
        declaration: &DeclaredDependency,
    ) -> Result<(), LatticeError> {
        match declaration {
            DeclaredDependency::CollectionOfType { tag } => {
                for (dep_name, handle) in self.registry.names_and_instances_assignable_to(tag) {
                    self.push(merged, component, dep_name, handle);
                }
                Ok(())
            }
            DeclaredDependency::SingleOfType { tag, required } => {
                let candidates = self.registry.names_and_instances_assignable_to(tag);
                match candidates.len() {
                    0 if *required => Err(LatticeError::MissingDependency {
                        component: component.to_string(),
                        dependency: format!("<{tag}>"),
                    }),
                    0 => {
                        debug!(
                            "Optional dependency of '{}' on type '{}' has no candidates, skipping",
                            component, tag
                        );
                        Ok(())
                    }
                    1 => {
                        let (dep_name, handle) = candidates.into_iter().next().expect("one candidate");
                        self.push(merged, component, dep_name, handle);
                        Ok(())
                    }
                    count => Err(LatticeError::AmbiguousDependency {
                        component: component.to_string(),
                        tag: tag.clone(),
                        count,
                    }),
                }
            }
            DeclaredDependency::SingleNamed { name, required } => {
                match self.registry.get(name) {
                    Some(handle) => {
                        self.push(merged, component, name.clone(), handle);
                        Ok(())
                    }
                    None if *required => Err(LatticeError::MissingDependency {
                        component: component.to_string(),
                        dependency: name.clone(),
                    }),
                    None => {
                        debug!(
                            "Optional dependency '{}' of '{}' is not registered, skipping",
                            name, component
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    /// Append `dependency` if registered; unregistered names are ignored at
    /// this level.
    fn push_registered(
        &self,
        merged: &mut Vec<(String, ComponentHandle)>,
        component: &str,
        dependency: &str,
    ) {
        match self.registry.get(dependency) {
            Some(handle) => self.push(merged, component, dependency.to_string(), handle),
            None => debug!(
                "Dependency '{}' of '{}' is not registered, skipping",
                dependency, component
            ),
        }
    }

    /// Append unless an equal entry is already present. Equality accounts for
    /// interception wrappers via `ComponentIdentity`, not just names.
    fn push(
        &self,
        merged: &mut Vec<(String, ComponentHandle)>,
        component: &str,
        dep_name: String,
        handle: ComponentHandle,
    ) {
        if dep_name == component {
            return;
        }
        let identity = self.registry.record(&dep_name).map(|record| &record.identity);
        let duplicate = merged.iter().any(|(existing, _)| {
            if *existing == dep_name {
                return true;
            }
            match (identity, self.registry.record(existing)) {
                (Some(a), Some(existing_record)) => a.same_instance(&existing_record.identity),
                _ => false,
            }
        });
        if !duplicate {
            merged.push((dep_name, handle));
        }
    }
}
