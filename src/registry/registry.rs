//! In-memory component registry.
//!
//! Holds named instances with their identity, type tags, dependency
//! metadata, and lifecycle state. Equal names within one orchestration run
//! always denote the same instance; unregistering a name and registering it
//! again creates a new existence with a fresh epoch id and a reset state.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::lifecycle::phase::LifecycleState;
use crate::registry::identity::{ComponentHandle, ComponentIdentity};
use crate::registry::manifest::{DeclaredDependency, DependencyManifest};
use crate::traits::LatticeError;

/// Everything the registry needs to admit a component.
#[derive(Clone)]
pub struct Registration {
    pub handle: ComponentHandle,
    pub identity: ComponentIdentity,
    /// Type tags used for bucket classification and assignability
    pub kinds: Vec<String>,
    pub singleton: bool,
    /// Auto-discovered dependencies, computed by the surrounding framework
    pub manifest: DependencyManifest,
    /// Programmatically declared dependencies
    pub declared: Vec<DeclaredDependency>,
}

impl Registration {
    /// Registration for a directly-compared singleton instance.
    pub fn new(handle: ComponentHandle) -> Self {
        Self {
            identity: ComponentIdentity::Direct(handle.clone()),
            handle,
            kinds: Vec::new(),
            singleton: true,
            manifest: DependencyManifest::empty(),
            declared: Vec::new(),
        }
    }

    /// Registration for an interception wrapper around an instance with the
    /// given hash.
    pub fn proxied(handle: ComponentHandle, underlying_hash: u64) -> Self {
        Self {
            identity: ComponentIdentity::Proxied {
                handle: handle.clone(),
                underlying_hash,
            },
            handle,
            kinds: Vec::new(),
            singleton: true,
            manifest: DependencyManifest::empty(),
            declared: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.push(kind.into());
        self
    }

    pub fn with_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds.extend(kinds.into_iter().map(Into::into));
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

    pub fn prototype(mut self) -> Self {
        self.singleton = false;
        self
    }
}

/// A registered component and its orchestration metadata.
pub struct ComponentRecord {
    pub name: String,
    pub handle: ComponentHandle,
    pub identity: ComponentIdentity,
    pub kinds: Vec<String>,
    pub singleton: bool,
    pub manifest: DependencyManifest,
    pub declared: Vec<DeclaredDependency>,
    pub state: LifecycleState,
    /// Registration sequence number; defines creation order
    pub seq: u64,
    /// Fresh per registration; a re-registered name is a new existence
    pub epoch: Uuid,
}

/// Registry of named component instances.
#[derive(Default)]
pub struct ComponentRegistry {
    records: HashMap<String, ComponentRecord>,
    next_seq: u64,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under a unique name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        registration: Registration,
    ) -> Result<(), LatticeError> {
        let name = name.into();
        if self.records.contains_key(&name) {
            return Err(LatticeError::AlreadyRegistered(name));
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let record = ComponentRecord {
            handle: registration.handle,
            identity: registration.identity,
            kinds: registration.kinds,
            singleton: registration.singleton,
            manifest: registration.manifest,
            declared: registration.declared,
            state: LifecycleState::NotStarted,
            seq,
            epoch: Uuid::new_v4(),
            name: name.clone(),
        };

        debug!("Registered component '{}' (seq {})", name, seq);
        self.records.insert(name, record);
        Ok(())
    }

    /// Remove a component, returning its record.
    ///
    /// The record's lifecycle state dies with it; re-registering the same
    /// name starts over from `NotStarted`.
    pub fn unregister(&mut self, name: &str) -> Result<ComponentRecord, LatticeError> {
        self.records
            .remove(name)
            .ok_or_else(|| LatticeError::ComponentNotFound(name.to_string()))
    }

    /// Instance handle registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<ComponentHandle> {
        self.records.get(name).map(|record| record.handle.clone())
    }

    pub fn record(&self, name: &str) -> Option<&ComponentRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn is_singleton(&self, name: &str) -> bool {
        self.records
            .get(name)
            .map(|record| record.singleton)
            .unwrap_or(false)
    }

    pub fn state(&self, name: &str) -> Option<LifecycleState> {
        self.records.get(name).map(|record| record.state)
    }

    pub fn set_state(&mut self, name: &str, state: LifecycleState) {
        if let Some(record) = self.records.get_mut(name) {
            record.state = state;
        }
    }

    /// All registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        let mut records: Vec<&ComponentRecord> = self.records.values().collect();
        records.sort_by_key(|record| record.seq);
        records.iter().map(|record| record.name.clone()).collect()
    }

    /// Names and instances of every entry assignable to the given type tag,
    /// in registration order.
    pub fn names_and_instances_assignable_to(
        &self,
        tag: &str,
    ) -> Vec<(String, ComponentHandle)> {
        let mut matches: Vec<&ComponentRecord> = self
            .records
            .values()
            .filter(|record| record.kinds.iter().any(|kind| kind == tag))
            .collect();
        matches.sort_by_key(|record| record.seq);
        matches
            .iter()
            .map(|record| (record.name.clone(), record.handle.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
