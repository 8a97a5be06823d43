//! Dependency resolution, graph construction, and topological ordering.

pub mod builder;
pub mod order;
pub mod resolver;

pub use builder::{BucketSpec, DependencyGraph, GraphBuilder};
pub use order::order;
pub use resolver::{DependencyResolver, DependencySources};
