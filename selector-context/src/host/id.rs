//! Identifier types for the host engine.
//!
//! Instances, listeners, channels and component definitions each get a
//! process-unique ID from their own atomic counter. IDs are never reused, so a
//! stale ID simply stops resolving once its owner is gone.

use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! unique_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Generate a new unique ID.
            pub fn new() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(0);
                Self(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            /// Get the raw ID value.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

unique_id!(
    /// Identifies one mounted component instance in a [`Renderer`](super::Renderer) tree.
    InstanceId
);

unique_id!(
    /// Identifies a listener registered on a shared value holder.
    ListenerId
);

unique_id!(
    /// Identifies an ambient channel.
    ChannelId
);

unique_id!(
    /// Identifies a component definition. Two elements reconcile onto the
    /// same instance only if their component IDs match.
    ComponentId
);

/// Generate the next version stamp for a provided ambient value.
///
/// Version 0 is never handed out; it stays free as a sentinel for tests.
pub(crate) fn next_version() -> u64 {
    static VERSION: AtomicU64 = AtomicU64::new(1);
    VERSION.fetch_add(1, Ordering::Relaxed)
}
