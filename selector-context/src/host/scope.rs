//! Ambient Channels
//!
//! An ambient channel delivers a value to every descendant of the instance
//! that provides it, without threading the value through props.
//!
//! # Implementation
//!
//! The renderer keeps a persistent, linked chain of frames while it walks
//! the tree. Each instance that provides a value pushes one frame for its
//! subtree. Lookups walk from the innermost frame outwards, so the nearest
//! provider shadows any outer one. A missing frame means the channel's
//! default value.
//!
//! Every provided value carries a version. The version only moves when an
//! instance provides a value that differs from what it provided last time,
//! which lets instances that read the channel detect a real change without
//! comparing values themselves.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;

use super::id::{next_version, ChannelId};

/// A typed ambient channel with a default value.
///
/// Channels are cheap to clone; clones refer to the same channel.
pub struct AmbientChannel<T> {
    id: ChannelId,
    default: Arc<T>,
    _value: PhantomData<fn() -> T>,
}

impl<T> AmbientChannel<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new channel. Readers outside any provider see `default`.
    pub fn new(default: T) -> Self {
        Self {
            id: ChannelId::new(),
            default: Arc::new(default),
            _value: PhantomData,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Resolve the channel in `scope`, falling back to the default.
    pub(crate) fn resolve(&self, scope: &Scope) -> (T, Option<u64>) {
        match scope.lookup(self.id) {
            Some(frame) => match frame.value.downcast_ref::<T>() {
                Some(value) => (value.clone(), Some(frame.version)),
                None => ((*self.default).clone(), Some(frame.version)),
            },
            None => ((*self.default).clone(), None),
        }
    }
}

impl<T> Clone for AmbientChannel<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: Arc::clone(&self.default),
            _value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for AmbientChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientChannel").field("id", &self.id).finish()
    }
}

/// One provided value in the scope chain.
struct Frame {
    channel: ChannelId,
    value: Arc<dyn Any + Send + Sync>,
    version: u64,
    parent: Option<Arc<Frame>>,
}

/// The chain of provided values visible at one point in the tree.
#[derive(Clone, Default)]
pub(crate) struct Scope {
    head: Option<Arc<Frame>>,
}

impl Scope {
    fn lookup(&self, channel: ChannelId) -> Option<&Frame> {
        let mut cursor = self.head.as_deref();
        while let Some(frame) = cursor {
            if frame.channel == channel {
                return Some(frame);
            }
            cursor = frame.parent.as_deref();
        }
        None
    }

    /// The version of `channel` in this scope, `None` when nothing provides it.
    pub(crate) fn version_of(&self, channel: ChannelId) -> Option<u64> {
        self.lookup(channel).map(|frame| frame.version)
    }

    /// The scope seen by the children of an instance that provided `values`.
    pub(crate) fn extend(&self, values: &ProvidedValues) -> Scope {
        let mut head = self.head.clone();
        for (channel, provided) in values.iter() {
            head = Some(Arc::new(Frame {
                channel: *channel,
                value: Arc::clone(&provided.value),
                version: provided.version,
                parent: head,
            }));
        }
        Scope { head }
    }
}

/// A value an instance provided during its last render.
#[derive(Clone)]
pub(crate) struct Provided {
    value: Arc<dyn Any + Send + Sync>,
    version: u64,
}

/// Everything one instance provides, keyed by channel.
pub(crate) type ProvidedValues = IndexMap<ChannelId, Provided>;

/// Build the entry for `value`, keeping the previous version if the value is
/// unchanged.
pub(crate) fn provide_value<T>(previous: Option<&Provided>, value: T) -> Provided
where
    T: PartialEq + Send + Sync + 'static,
{
    let unchanged = previous
        .and_then(|prev| prev.value.downcast_ref::<T>())
        .is_some_and(|prev| *prev == value);

    match previous {
        Some(prev) if unchanged => prev.clone(),
        _ => Provided {
            value: Arc::new(value),
            version: next_version(),
        },
    }
}

/// A channel read recorded during render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChannelRead {
    pub(crate) channel: ChannelId,
    pub(crate) version: Option<u64>,
}

impl ChannelRead {
    /// Whether the channel resolves to something else in `scope` now.
    pub(crate) fn is_stale(&self, scope: &Scope) -> bool {
        scope.version_of(self.channel) != self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provide<T>(values: &mut ProvidedValues, channel: &AmbientChannel<T>, value: T)
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let entry = provide_value(values.get(&channel.id()), value);
        values.insert(channel.id(), entry);
    }

    #[test]
    fn missing_provider_yields_default() {
        let channel = AmbientChannel::new(7u32);
        let (value, version) = channel.resolve(&Scope::default());

        assert_eq!(value, 7);
        assert_eq!(version, None);
    }

    #[test]
    fn innermost_provider_wins() {
        let channel = AmbientChannel::new(0u32);

        let mut outer = ProvidedValues::new();
        provide(&mut outer, &channel, 1);
        let outer_scope = Scope::default().extend(&outer);

        let mut inner = ProvidedValues::new();
        provide(&mut inner, &channel, 2);
        let inner_scope = outer_scope.extend(&inner);

        assert_eq!(channel.resolve(&outer_scope).0, 1);
        assert_eq!(channel.resolve(&inner_scope).0, 2);
    }

    #[test]
    fn channels_do_not_interfere() {
        let first = AmbientChannel::new(0u32);
        let second = AmbientChannel::new(0u32);

        let mut values = ProvidedValues::new();
        provide(&mut values, &first, 5);
        let scope = Scope::default().extend(&values);

        assert_eq!(first.resolve(&scope).0, 5);
        assert_eq!(second.resolve(&scope), (0, None));
    }

    #[test]
    fn version_moves_only_on_change() {
        let channel = AmbientChannel::new(0u32);
        let mut values = ProvidedValues::new();

        provide(&mut values, &channel, 1);
        let first = Scope::default().extend(&values).version_of(channel.id());

        provide(&mut values, &channel, 1);
        let same = Scope::default().extend(&values).version_of(channel.id());

        provide(&mut values, &channel, 2);
        let changed = Scope::default().extend(&values).version_of(channel.id());

        assert_eq!(first, same);
        assert_ne!(same, changed);
    }

    #[test]
    fn stale_reads_are_detected() {
        let channel = AmbientChannel::new(0u32);
        let mut values = ProvidedValues::new();
        provide(&mut values, &channel, 1);
        let scope = Scope::default().extend(&values);

        let read = ChannelRead {
            channel: channel.id(),
            version: scope.version_of(channel.id()),
        };
        assert!(!read.is_stale(&scope));
        assert!(read.is_stale(&Scope::default()));
    }
}
