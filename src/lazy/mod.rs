//! Lazy materialization: minimal subgraph resolution and session tracking.

pub mod descriptor;
pub mod materializer;
pub mod session;

pub use descriptor::{ComponentDescriptor, DescriptorModel};
pub use materializer::{compute_minimal_set, MinimalSet, PlannedRegistration};
pub use session::MaterializationSession;
