//! Lifecycle phases and per-component state tracking.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One stage of a component's lifecycle.
///
/// Build phases (`Initialize`, `Start`) run dependencies-first; teardown
/// phases (`Stop`, `Dispose`) run dependents-first over the same ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Prepare the component for operation
    Initialize,
    /// Begin active processing
    Start,
    /// Graceful shutdown of active processing
    Stop,
    /// Release all resources
    Dispose,
}

impl Phase {
    /// Whether this phase builds components up (as opposed to tearing down)
    pub fn is_build(&self) -> bool {
        matches!(self, Phase::Initialize | Phase::Start)
    }

    /// Whether this phase tears components down
    pub fn is_teardown(&self) -> bool {
        !self.is_build()
    }

    /// The state a component reaches once this phase completes
    pub fn target_state(&self) -> LifecycleState {
        match self {
            Phase::Initialize => LifecycleState::Initialized,
            Phase::Start => LifecycleState::Started,
            Phase::Stop => LifecycleState::Stopped,
            Phase::Dispose => LifecycleState::Disposed,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initialize => "initialize",
            Phase::Start => "start",
            Phase::Stop => "stop",
            Phase::Dispose => "dispose",
        };
        f.write_str(name)
    }
}

/// Component lifecycle state
///
/// States advance monotonically. A component returns to `NotStarted` only by
/// being unregistered and registered again, which is a new existence with a
/// fresh epoch id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Registered but no phase applied yet
    NotStarted,
    /// Initialize phase completed
    Initialized,
    /// Start phase completed
    Started,
    /// Stop phase completed
    Stopped,
    /// Dispose phase completed; terminal
    Disposed,
}

impl LifecycleState {
    /// Whether this state already covers the given phase.
    ///
    /// Used for the idempotent skip: applying a phase to a component whose
    /// state is at or past the phase's target is a no-op.
    pub fn at_or_past(&self, phase: Phase) -> bool {
        *self >= phase.target_state()
    }

    /// Whether a component in this state is eligible for the given phase.
    ///
    /// `Dispose` is reachable from any non-disposed state (emergency
    /// teardown); the other phases require their natural predecessor.
    pub fn ready_for(&self, phase: Phase) -> bool {
        match phase {
            Phase::Initialize => *self == LifecycleState::NotStarted,
            Phase::Start => *self == LifecycleState::Initialized,
            Phase::Stop => *self == LifecycleState::Started,
            Phase::Dispose => *self != LifecycleState::Disposed,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::NotStarted => "not-started",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Started => "started",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}
