//! Materialization session state.
//!
//! One value per container, owned by the container and passed by reference
//! into the minimal-subgraph resolver. Tracks which components the last lazy
//! pass created (in creation order, for reverse teardown) and a fingerprint
//! of the last request so compatible requests can be answered without a
//! rebuild.

use std::collections::HashSet;

/// State carried between lazy-materialization passes.
#[derive(Debug, Default)]
pub struct MaterializationSession {
    /// Registration names created by the current session, creation order
    created: Vec<String>,
    /// Locations covered by the current session
    locations: HashSet<String>,
    apply_start: bool,
    pass: u64,
    active: bool,
}

impl MaterializationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether at least one materialization pass has completed.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of completed materialization passes.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Names created by the session, in creation order.
    pub fn created(&self) -> &[String] {
        &self.created
    }

    /// Start setting of the last completed pass.
    pub fn apply_start(&self) -> bool {
        self.apply_start
    }

    /// Drop one name from the baseline after it is unregistered.
    pub fn forget(&mut self, name: &str) {
        self.created.retain(|existing| existing != name);
    }

    pub fn covers(&self, name: &str) -> bool {
        self.created.iter().any(|existing| existing == name)
    }

    /// Whether a request for `locations` is already satisfied by the current
    /// session, so teardown and rebuild can be skipped entirely.
    pub fn satisfies(&self, locations: &HashSet<String>, apply_start: bool) -> bool {
        self.active
            && self.apply_start == apply_start
            && locations.is_subset(&self.locations)
    }

    /// Record the outcome of a full materialization pass, replacing the
    /// baseline.
    pub fn complete_pass(
        &mut self,
        locations: HashSet<String>,
        apply_start: bool,
        created: Vec<String>,
    ) {
        self.locations = locations;
        self.apply_start = apply_start;
        self.created = created;
        self.pass += 1;
        self.active = true;
    }

    /// Extend the baseline with components added while keeping the previous
    /// set.
    pub fn extend(&mut self, locations: impl IntoIterator<Item = String>, created: Vec<String>) {
        self.locations.extend(locations);
        for name in created {
            if !self.covers(&name) {
                self.created.push(name);
            }
        }
        self.pass += 1;
    }
}
