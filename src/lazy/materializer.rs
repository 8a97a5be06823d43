//! Minimal subgraph resolution for lazy materialization.
//!
//! Computes the smallest descriptor set that satisfies a request: every
//! descriptor the selector matches, the always-enabled descriptors, the
//! structural ancestors needed to reach them, and the descriptor-level
//! dependency closure. Descriptors reachable without a named top-level owner
//! are flagged as orphans so the container registers them directly.

use std::collections::HashSet;

use tracing::debug;

use crate::lazy::descriptor::DescriptorModel;
use crate::traits::{ConfigDependencyIndex, LatticeError, Selector};

/// One planned registration within a minimal set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRegistration {
    pub location: String,
    /// Name the component registers under
    pub name: String,
    /// True when the descriptor has no named top-level owner and must be
    /// registered directly to receive lifecycle treatment
    pub orphan: bool,
}

/// The target of one lazy-materialization pass.
#[derive(Debug, Clone, Default)]
pub struct MinimalSet {
    /// Member locations in model order
    pub members: Vec<String>,
    /// Registrations to perform, model order
    pub to_register: Vec<PlannedRegistration>,
}

impl MinimalSet {
    pub fn member_locations(&self) -> HashSet<String> {
        self.members.iter().cloned().collect()
    }

    pub fn registration_names(&self) -> Vec<String> {
        self.to_register
            .iter()
            .map(|planned| planned.name.clone())
            .collect()
    }
}

/// Compute the minimal configuration subset for `selector`.
///
/// A single-target selector whose target is absent from the computed set
/// fails with [`LatticeError::TargetNotFound`].
pub fn compute_minimal_set(
    model: &DescriptorModel,
    index: &dyn ConfigDependencyIndex,
    selector: &Selector,
) -> Result<MinimalSet, LatticeError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut worklist: Vec<String> = Vec::new();

    // Always-enabled descriptors first, by declared precedence
    for descriptor in model.always_enabled() {
        if seen.insert(descriptor.location.clone()) {
            worklist.push(descriptor.location.clone());
        }
    }
    for descriptor in model.iter() {
        if selector.accepts(descriptor) && seen.insert(descriptor.location.clone()) {
            worklist.push(descriptor.location.clone());
        }
    }

    // Close over structural ancestors and descriptor-level dependencies
    while let Some(location) = worklist.pop() {
        let Some(descriptor) = model.get(&location) else {
            continue;
        };
        for ancestor in model.ancestors_of(&location) {
            if seen.insert(ancestor.location.clone()) {
                worklist.push(ancestor.location.clone());
            }
        }
        for dependency in model.dependency_locations(descriptor, index) {
            if seen.insert(dependency.clone()) {
                worklist.push(dependency);
            }
        }
    }

    if let Selector::Target(target) = selector {
        if !seen.contains(target) {
            return Err(LatticeError::TargetNotFound(target.clone()));
        }
    }

    // Model order keeps parents ahead of children for registration
    let mut members: Vec<String> = seen.into_iter().collect();
    members.sort_by_key(|location| model.position(location).unwrap_or(usize::MAX));

    let member_set: HashSet<&String> = members.iter().collect();
    let mut to_register = Vec::new();
    for location in &members {
        let Some(descriptor) = model.get(location) else {
            continue;
        };
        if descriptor.is_top_level() && descriptor.name.is_some() {
            to_register.push(PlannedRegistration {
                location: location.clone(),
                name: descriptor.registration_name().to_string(),
                orphan: false,
            });
            continue;
        }
        let owned = model
            .root_of(location)
            .is_some_and(|root| {
                root.location != *location
                    && root.name.is_some()
                    && member_set.contains(&root.location)
            });
        if !owned {
            debug!(
                "Descriptor '{}' has no named top-level owner, registering directly",
                location
            );
            to_register.push(PlannedRegistration {
                location: location.clone(),
                name: descriptor.registration_name().to_string(),
                orphan: true,
            });
        }
    }

    debug!(
        "Minimal set: {} members, {} registrations",
        members.len(),
        to_register.len()
    );
    Ok(MinimalSet {
        members,
        to_register,
    })
}
