//! Dependency manifests attached at registration time.
//!
//! The surrounding framework computes injection metadata once, when a
//! component is registered, and hands it to the dependency resolver as plain
//! data. The resolver never inspects live instances.

use serde::{Deserialize, Serialize};

/// Auto-discovered dependencies implied by a component's injection points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyManifest {
    /// Names of components this component is wired to, in injection order
    #[serde(default)]
    pub injected: Vec<String>,
}

impl DependencyManifest {
    /// Manifest with no auto-discovered dependencies
    pub fn empty() -> Self {
        Self::default()
    }

    /// Manifest listing the given component names
    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            injected: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.injected.is_empty()
    }
}

/// A dependency a component exposes programmatically.
///
/// Collection-valued declarations enumerate every assignable registry entry
/// and can never be ambiguous. Single-valued declarations resolve exactly one
/// entry: more than one assignable candidate is an ambiguity error, and zero
/// candidates for a required declaration is a resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclaredDependency {
    /// Every registry entry assignable to the given type tag
    CollectionOfType { tag: String },
    /// Exactly one registry entry assignable to the given type tag
    SingleOfType { tag: String, required: bool },
    /// Exactly one registry entry with the given name
    SingleNamed { name: String, required: bool },
}

impl DeclaredDependency {
    /// All entries assignable to `tag`
    pub fn all_of_type(tag: impl Into<String>) -> Self {
        DeclaredDependency::CollectionOfType { tag: tag.into() }
    }

    /// Exactly one entry assignable to `tag`; missing is a resolution failure
    pub fn one_of_type(tag: impl Into<String>) -> Self {
        DeclaredDependency::SingleOfType {
            tag: tag.into(),
            required: true,
        }
    }

    /// Exactly one entry assignable to `tag`, skipped when absent
    pub fn one_of_type_optional(tag: impl Into<String>) -> Self {
        DeclaredDependency::SingleOfType {
            tag: tag.into(),
            required: false,
        }
    }

    /// The entry registered under `name`; missing is a resolution failure
    pub fn named(name: impl Into<String>) -> Self {
        DeclaredDependency::SingleNamed {
            name: name.into(),
            required: true,
        }
    }

    /// The entry registered under `name`, skipped when absent
    pub fn named_optional(name: impl Into<String>) -> Self {
        DeclaredDependency::SingleNamed {
            name: name.into(),
            required: false,
        }
    }
}
