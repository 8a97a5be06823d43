//! Component descriptors: the structural model lazy requests select over.
//!
//! Descriptors are plain data handed to the container by the surrounding
//! system (which owns parsing and template expansion). Each descriptor sits
//! at a unique location; parent links form the structural ancestor chain.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::registry::manifest::{DeclaredDependency, DependencyManifest};
use crate::traits::ConfigDependencyIndex;

fn default_singleton() -> bool {
    true
}

/// Declarative description of one materializable component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Unique location-style identifier, e.g. `"app/flow-a/listener"`
    pub location: String,
    /// Registration name; unnamed descriptors register under their location
    #[serde(default)]
    pub name: Option<String>,
    /// Location of the owning structural ancestor, if any
    #[serde(default)]
    pub parent: Option<String>,
    /// Type tags for bucket classification and assignability
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default = "default_singleton")]
    pub singleton: bool,
    /// Present for descriptors materialized on every request; lower
    /// precedence values materialize earlier
    #[serde(default)]
    pub always_enabled: Option<u32>,
    /// Auto-discovered dependencies of the produced instance
    #[serde(default)]
    pub manifest: DependencyManifest,
    /// Programmatic dependency declarations of the produced instance
    #[serde(default)]
    pub declared: Vec<DeclaredDependency>,
}

impl ComponentDescriptor {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            name: None,
            parent: None,
            kinds: Vec::new(),
            singleton: true,
            always_enabled: None,
            manifest: DependencyManifest::empty(),
            declared: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.push(kind.into());
        self
    }

    pub fn always_enabled(mut self, precedence: u32) -> Self {
        self.always_enabled = Some(precedence);
        self
    }

    pub fn with_manifest(mut self, manifest: DependencyManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_declared(mut self, declared: DeclaredDependency) -> Self {
        self.declared.push(declared);
        self
    }

    /// Name this descriptor's component registers under.
    pub fn registration_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.location)
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// The full descriptor set of one artifact, indexed by location.
#[derive(Debug, Clone, Default)]
pub struct DescriptorModel {
    descriptors: Vec<ComponentDescriptor>,
    by_location: HashMap<String, usize>,
}

impl DescriptorModel {
    pub fn new(descriptors: Vec<ComponentDescriptor>) -> Self {
        let mut model = Self::default();
        for descriptor in descriptors {
            model.push(descriptor);
        }
        model
    }

    pub fn push(&mut self, descriptor: ComponentDescriptor) {
        if self.by_location.contains_key(&descriptor.location) {
            warn!(
                "Descriptor model already contains location '{}', ignoring duplicate",
                descriptor.location
            );
            return;
        }
        self.by_location
            .insert(descriptor.location.clone(), self.descriptors.len());
        self.descriptors.push(descriptor);
    }

    pub fn get(&self, location: &str) -> Option<&ComponentDescriptor> {
        self.by_location
            .get(location)
            .map(|&index| &self.descriptors[index])
    }

    /// Descriptors in document order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Document-order position of a location; used to keep minimal sets in
    /// model order.
    pub fn position(&self, location: &str) -> Option<usize> {
        self.by_location.get(location).copied()
    }

    /// Structural ancestors of a location, nearest first.
    pub fn ancestors_of(&self, location: &str) -> Vec<&ComponentDescriptor> {
        let mut ancestors = Vec::new();
        let mut current = self.get(location).and_then(|d| d.parent.as_deref());
        while let Some(parent_location) = current {
            match self.get(parent_location) {
                Some(parent) => {
                    ancestors.push(parent);
                    current = parent.parent.as_deref();
                }
                None => {
                    warn!(
                        "Descriptor '{}' references unknown parent '{}'",
                        location, parent_location
                    );
                    break;
                }
            }
        }
        ancestors
    }

    /// Root of the structural ancestor chain (the descriptor itself when
    /// top-level).
    pub fn root_of(&self, location: &str) -> Option<&ComponentDescriptor> {
        let descriptor = self.get(location)?;
        Some(
            self.ancestors_of(location)
                .into_iter()
                .last()
                .unwrap_or(descriptor),
        )
    }

    /// Always-enabled descriptors by declared precedence, document order as
    /// the tie-break.
    pub fn always_enabled(&self) -> Vec<&ComponentDescriptor> {
        let mut enabled: Vec<(u32, usize)> = self
            .descriptors
            .iter()
            .enumerate()
            .filter_map(|(index, descriptor)| {
                descriptor.always_enabled.map(|precedence| (precedence, index))
            })
            .collect();
        enabled.sort();
        enabled
            .into_iter()
            .map(|(_, index)| &self.descriptors[index])
            .collect()
    }

    /// Locations of the descriptors `descriptor`'s component depends on,
    /// resolved against the model: manifest names, configuration-index names,
    /// and declarations matched by registration name or kind.
    pub fn dependency_locations(
        &self,
        descriptor: &ComponentDescriptor,
        index: &dyn ConfigDependencyIndex,
    ) -> Vec<String> {
        let mut locations = Vec::new();
        let mut push = |location: &str| {
            if !locations.iter().any(|existing| existing == location) {
                locations.push(location.to_string());
            }
        };

        let by_name = |name: &str, push: &mut dyn FnMut(&str)| {
            for candidate in &self.descriptors {
                if candidate.registration_name() == name || candidate.location == name {
                    push(&candidate.location);
                }
            }
        };

        for name in &descriptor.manifest.injected {
            by_name(name, &mut push);
        }
        for name in index.direct_dependencies_of(descriptor.registration_name()) {
            by_name(&name, &mut push);
        }
        for declaration in &descriptor.declared {
            match declaration {
                DeclaredDependency::SingleNamed { name, .. } => by_name(name, &mut push),
                DeclaredDependency::CollectionOfType { tag }
                | DeclaredDependency::SingleOfType { tag, .. } => {
                    for candidate in &self.descriptors {
                        if candidate.kinds.iter().any(|kind| kind == tag) {
                            push(&candidate.location);
                        }
                    }
                }
            }
        }
        locations
    }
}
