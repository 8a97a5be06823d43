//! Lifecycle phases, state tracking, and phase application.

pub mod orchestrator;
pub mod phase;

pub use orchestrator::{CallbackRegistry, LifecycleOrchestrator};
pub use phase::{LifecycleState, Phase};
