//! Selector Context
//!
//! A context whose consumers subscribe to a projection of the shared value
//! instead of the value itself.
//!
//! # How It Works
//!
//! The provider does not put the value on the ambient channel. It publishes a
//! [`SharedValueHolder`] whose identity never changes, so a new value does not
//! invalidate every reader. Instead:
//!
//! 1. Each render the provider writes the new value into the holder before
//!    its children render.
//!
//! 2. Each consumer projects the current value during render, caches the
//!    projection and registers a listener in a layout effect.
//!
//! 3. After commit the provider notifies all listeners inside one batch.
//!    A listener recomputes its projection and forces a re-render of its own
//!    instance only when the projection differs from the cached one.
//!
//! Consumers that skip the re-render keep their output. The ones that do
//! re-render are coalesced into one follow-up pass.
//!
//! # Example
//!
//! ```rust,ignore
//! let user = create_context::<User>(None);
//!
//! let name_label = {
//!     let user = user.clone();
//!     Component::new("NameLabel", move |cx, _props: &()| {
//!         let name = use_context_keys(cx, &user, "name");
//!         Vec::new()
//!     })
//! };
//!
//! renderer.render(user.provide(current_user, vec![name_label.element(())]))?;
//! ```

mod holder;
mod select;

use std::fmt;
use std::sync::Arc;

pub use holder::{SharedValueHolder, Trigger};
pub use select::{
    use_context, use_context_keys, use_context_selector, use_holder, KeySelector,
};

use crate::host::{AmbientChannel, ByAddress, Component, Element};

pub(crate) type HolderRef<T> = ByAddress<SharedValueHolder<T>>;

/// Props of a selector context provider.
pub struct ProviderProps<T> {
    pub value: Arc<T>,
}

impl<T> ProviderProps<T> {
    pub fn new(value: impl Into<Arc<T>>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl<T> Clone for ProviderProps<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ProviderProps<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderProps")
            .field("value", &self.value)
            .finish()
    }
}

/// A context created by [`create_context`].
///
/// Clones share the provider component and the channel, so a clone can be
/// moved into each consumer's render closure.
pub struct SelectorContext<T> {
    channel: AmbientChannel<Option<HolderRef<T>>>,
    provider: Component<ProviderProps<T>>,
    default_value: Option<Arc<T>>,
}

/// Create a selector context.
///
/// Consumers rendered outside any provider read `default_value` once,
/// without subscribing. With no default they read `None`.
pub fn create_context<T>(default_value: Option<T>) -> SelectorContext<T>
where
    T: Send + Sync + 'static,
{
    SelectorContext::new(default_value)
}

impl<T> SelectorContext<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(default_value: Option<T>) -> Self {
        let channel = AmbientChannel::new(None);
        let provider = provider_component(channel.clone());

        Self {
            channel,
            provider,
            default_value: default_value.map(Arc::new),
        }
    }

    /// The provider component.
    pub fn provider(&self) -> &Component<ProviderProps<T>> {
        &self.provider
    }

    /// Build a provider element for `value` wrapping `children`.
    ///
    /// Passing an `Arc` that is already shared keeps the value's identity,
    /// which is what the provider compares to decide whether to notify.
    pub fn provide(&self, value: impl Into<Arc<T>>, children: Vec<Element>) -> Element {
        self.provider
            .element(ProviderProps::new(value))
            .with_children(children)
    }

    pub fn default_value(&self) -> Option<&Arc<T>> {
        self.default_value.as_ref()
    }

    pub(crate) fn channel(&self) -> &AmbientChannel<Option<HolderRef<T>>> {
        &self.channel
    }
}

fn provider_component<T>(
    channel: AmbientChannel<Option<HolderRef<T>>>,
) -> Component<ProviderProps<T>>
where
    T: Send + Sync + 'static,
{
    Component::new("SelectorProvider", move |cx, props: &ProviderProps<T>| {
        let holder = cx
            .use_ref(|| Arc::new(SharedValueHolder::new(Arc::clone(&props.value))))
            .get();
        holder.replace(Arc::clone(&props.value));

        let batcher = cx.batcher();
        let notify_holder = Arc::clone(&holder);
        let value = Arc::clone(&props.value);
        cx.use_layout_effect(ByAddress(Arc::clone(&props.value)), move || {
            let notified = batcher.batch(|| notify_holder.notify(&value));
            tracing::debug!(listeners = notified, "context value changed, listeners notified");
            None
        });

        cx.provide(&channel, Some(ByAddress(holder)));
        cx.children().to_vec()
    })
}

impl<T> Clone for SelectorContext<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            provider: self.provider.clone(),
            default_value: self.default_value.clone(),
        }
    }
}

impl<T> fmt::Debug for SelectorContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorContext")
            .field("channel", &self.channel)
            .field("has_default", &self.default_value.is_some())
            .finish()
    }
}
