//! lattice - dependency-graph-driven component lifecycle orchestration
//!
//! This crate decides, for a set of managed runtime components, the order in
//! which multi-phase lifecycle operations (initialize, start, stop, dispose)
//! are applied, and supports lazy materialization of the minimal component
//! subset needed to satisfy a request, with safe teardown and rebuild of
//! that subset.
//!
//! ## Architecture
//!
//! - **Registry**: named instances with identity, type tags, and per-component
//!   lifecycle state
//! - **Dependency Resolver**: merges auto-discovered, configuration-derived,
//!   and declared dependencies into one ordered list
//! - **Graph Builder + Orderer**: per-bucket acyclic graphs with deterministic
//!   topological order, read forward to build and reversed to tear down
//! - **Lifecycle Orchestrator**: phase application with direction-specific
//!   failure policy (build aborts, teardown is best-effort)
//! - **Minimal Subgraph Resolver**: lazy materialization over a descriptor
//!   model with session-tracked teardown/rebuild
//!
//! One [`Container`] is one independent pipeline; containers share no state.
//! Configuration parsing, instance construction, and transport concerns stay
//! with the surrounding system behind the traits in [`traits`].

pub mod container;
pub mod graph;
pub mod lazy;
pub mod lifecycle;
pub mod registry;
pub mod traits;

pub use container::{Container, ContainerBuilder, MaterializeOptions};
pub use graph::{BucketSpec, DependencySources};
pub use lazy::{ComponentDescriptor, MaterializationSession};
pub use lifecycle::{CallbackRegistry, LifecycleState, Phase};
pub use registry::{
    ComponentHandle, ComponentIdentity, ComponentRegistry, DeclaredDependency, DependencyManifest,
    Registration,
};
pub use traits::{
    ComponentFactory, ComponentRef, ConfigDependencyIndex, LatticeError, PhaseCallback, Selector,
    StaticDependencyIndex,
};
