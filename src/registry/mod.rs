//! Component registry: named instances, identity, and lifecycle state.

pub mod identity;
pub mod manifest;
pub mod registry;

pub use identity::{ComponentHandle, ComponentIdentity};
pub use manifest::{DeclaredDependency, DependencyManifest};
pub use registry::{ComponentRecord, ComponentRegistry, Registration};
