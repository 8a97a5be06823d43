//! Identity-comparable component handles.
//!
//! Instance handles are opaque `Arc<dyn Any>` values. Plain pointer equality
//! breaks down when an instance is hidden behind a transparent interception
//! wrapper, so every registration selects a `ComponentIdentity` up front:
//! either the handle itself is the instance (`Direct`), or it is a wrapper
//! and carries the hash of the object underneath (`Proxied`).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque, shareable handle to a managed component instance.
pub type ComponentHandle = Arc<dyn Any + Send + Sync>;

/// How a component's instance handle compares to other handles.
#[derive(Clone)]
pub enum ComponentIdentity {
    /// The handle is the instance; compared by pointer.
    Direct(ComponentHandle),
    /// The handle is an interception wrapper around the real instance;
    /// compared by the wrapped object's hash.
    Proxied {
        handle: ComponentHandle,
        underlying_hash: u64,
    },
}

impl ComponentIdentity {
    /// The handle this identity was registered with.
    pub fn handle(&self) -> &ComponentHandle {
        match self {
            ComponentIdentity::Direct(handle) => handle,
            ComponentIdentity::Proxied { handle, .. } => handle,
        }
    }

    /// Whether two identities denote the same underlying instance.
    ///
    /// Two `Direct` identities compare by pointer. Two `Proxied` identities
    /// compare by underlying hash. A mixed pair matches only on pointer
    /// equality of the handles: wrapper transparency must be declared on both
    /// sides at registration time, never guessed.
    pub fn same_instance(&self, other: &ComponentIdentity) -> bool {
        use ComponentIdentity::*;
        match (self, other) {
            (Direct(a), Direct(b)) => Arc::ptr_eq(a, b),
            (
                Proxied {
                    underlying_hash: a, ..
                },
                Proxied {
                    underlying_hash: b, ..
                },
            ) => a == b,
            (a, b) => Arc::ptr_eq(a.handle(), b.handle()),
        }
    }

    /// Whether this identity denotes the given raw handle.
    pub fn is_handle(&self, handle: &ComponentHandle) -> bool {
        Arc::ptr_eq(self.handle(), handle)
    }
}

impl fmt::Debug for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentIdentity::Direct(handle) => f
                .debug_tuple("Direct")
                .field(&Arc::as_ptr(handle))
                .finish(),
            ComponentIdentity::Proxied {
                handle,
                underlying_hash,
            } => f
                .debug_struct("Proxied")
                .field("handle", &Arc::as_ptr(handle))
                .field("underlying_hash", underlying_hash)
                .finish(),
        }
    }
}
