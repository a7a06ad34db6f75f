//! Render context and hooks
//!
//! Every component render receives a [`RenderContext`]. Hooks are methods on
//! the context and are identified by call order, so a component must call the
//! same hooks in the same order on every render.
//!
//! Hook state lives in the instance (see [`HookState`]) and survives between
//! renders until the instance unmounts.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;

use super::effect::{Cleanup, EffectDeps, PendingEffect};
use super::element::{Element, ElementInner, Handle};
use super::event::StableFn;
use super::id::InstanceId;
use super::renderer::Engine;
use super::scheduler::Batcher;
use super::scope::{provide_value, AmbientChannel, ChannelRead, ProvidedValues, Scope};

/// Per-instance hook storage.
#[derive(Default)]
pub(crate) struct HookState {
    slots: Vec<Box<dyn Any + Send>>,
    cursor: usize,
    reads: SmallVec<[ChannelRead; 2]>,
    provided: ProvidedValues,
    next_provided: ProvidedValues,
}

impl HookState {
    pub(crate) fn begin(&mut self) {
        self.cursor = 0;
        self.reads.clear();
        self.next_provided.clear();
    }

    pub(crate) fn finish(&mut self, component: &str, dev_warnings: bool) {
        if dev_warnings && self.cursor != self.slots.len() {
            tracing::warn!(
                component,
                expected = self.slots.len(),
                called = self.cursor,
                "rendered a different number of hooks than before"
            );
        }
        self.provided = std::mem::take(&mut self.next_provided);
    }

    /// Whether any channel read during the last render changed in `scope`.
    pub(crate) fn reads_stale(&self, scope: &Scope) -> bool {
        self.reads.iter().any(|read| read.is_stale(scope))
    }

    pub(crate) fn provided(&self) -> &ProvidedValues {
        &self.provided
    }
}

/// A durable mutable cell owned by one instance.
pub struct Slot<T> {
    cell: Arc<Mutex<T>>,
}

impl<T> Slot<T> {
    fn new(value: T) -> Self {
        Self {
            cell: Arc::new(Mutex::new(value)),
        }
    }

    pub fn set(&self, value: T) {
        *self.cell.lock() = value;
    }

    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.cell.lock(), value)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.cell.lock())
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.cell.lock()
    }
}

impl<T: Clone> Slot<T> {
    pub fn get(&self) -> T {
        self.cell.lock().clone()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&*self.cell.lock()).finish()
    }
}

/// Schedules a re-render of the instance that created it.
#[derive(Clone)]
pub struct ForceUpdate {
    engine: Weak<Engine>,
    instance: InstanceId,
}

impl ForceUpdate {
    /// Request a re-render.
    ///
    /// Inside a render pass, a commit or a batch the request is queued;
    /// otherwise it is flushed immediately.
    pub fn request(&self) {
        if let Some(engine) = self.engine.upgrade() {
            engine.request_update(self.instance);
        }
    }
}

impl fmt::Debug for ForceUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForceUpdate")
            .field("instance", &self.instance)
            .finish()
    }
}

/// Writes a state value and schedules the owning instance.
pub struct Setter<T> {
    value: Slot<T>,
    updater: ForceUpdate,
}

impl<T> Setter<T> {
    pub fn set(&self, value: T) {
        self.value.set(value);
        self.updater.request();
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.value.update(|current| *current = f(current));
        self.updater.request();
    }
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            updater: self.updater.clone(),
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("instance", &self.updater.instance)
            .finish()
    }
}

/// Compares the wrapped `Arc` by address instead of by value.
///
/// Useful as effect dependencies or ambient values where "the same
/// allocation" is the meaningful notion of equality.
pub struct ByAddress<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> PartialEq for ByAddress<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Eq for ByAddress<T> {}

impl<T: ?Sized> Clone for ByAddress<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> std::ops::Deref for ByAddress<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> fmt::Debug for ByAddress<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByAddress({:p})", Arc::as_ptr(&self.0))
    }
}

/// The context handed to a component's render function.
pub struct RenderContext<'a> {
    instance: InstanceId,
    state: &'a mut HookState,
    scope: &'a Scope,
    element: &'a ElementInner,
    effects: &'a mut Vec<PendingEffect>,
    engine: &'a Weak<Engine>,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(
        instance: InstanceId,
        state: &'a mut HookState,
        scope: &'a Scope,
        element: &'a ElementInner,
        effects: &'a mut Vec<PendingEffect>,
        engine: &'a Weak<Engine>,
    ) -> Self {
        Self {
            instance,
            state,
            scope,
            element,
            effects,
            engine,
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance
    }

    /// The children attached to the element being rendered.
    pub fn children(&self) -> &'a [Element] {
        &self.element.children
    }

    /// The external handle, if the component accepts one and it was given.
    pub fn handle(&self) -> Option<&'a Handle> {
        if self.element.component.accepts_handle() {
            self.element.handle.as_ref()
        } else {
            None
        }
    }

    /// A batching scope bound to this instance's renderer.
    pub fn batcher(&self) -> Batcher {
        Batcher::new(self.engine.clone())
    }

    fn next_slot<T, F>(&mut self, init: F) -> (usize, &mut T)
    where
        T: Any + Send,
        F: FnOnce() -> T,
    {
        let index = self.state.cursor;
        self.state.cursor += 1;

        let slots = &mut self.state.slots;
        if index == slots.len() {
            slots.push(Box::new(init()));
        } else if !slots[index].is::<T>() {
            tracing::warn!(
                component = self.element.component.name(),
                hook = index,
                "hook order changed between renders, resetting slot"
            );
            slots[index] = Box::new(init());
        }

        let slot = slots[index]
            .downcast_mut::<T>()
            .expect("hook slot holds the type it was just checked for");
        (index, slot)
    }

    /// A durable mutable cell, initialised on first render.
    pub fn use_ref<T, F>(&mut self, init: F) -> Slot<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T,
    {
        let (_, slot) = self.next_slot(|| Slot::new(init()));
        slot.clone()
    }

    /// A state value and a setter that schedules a re-render when called.
    pub fn use_state<T, F>(&mut self, init: F) -> (T, Setter<T>)
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> T,
    {
        let value = self.use_ref(init);
        let updater = self.use_force_update();
        (value.get(), Setter { value, updater })
    }

    /// A handle that re-renders this instance on request.
    pub fn use_force_update(&mut self) -> ForceUpdate {
        ForceUpdate {
            engine: self.engine.clone(),
            instance: self.instance,
        }
    }

    /// Run `effect` after commit whenever `deps` differs from the previous
    /// render's value. The returned cleanup runs before the next run and on
    /// unmount.
    pub fn use_layout_effect<D, F>(&mut self, deps: D, effect: F)
    where
        D: PartialEq + Send + 'static,
        F: FnOnce() -> Option<Cleanup> + Send + 'static,
    {
        let (hook, slot) = self.next_slot(|| EffectDeps::<D>(None));
        if slot.update(deps) {
            self.effects.push(PendingEffect {
                instance: self.instance,
                hook,
                run: Box::new(effect),
            });
        }
    }

    /// A stable callback that always dispatches to the closure passed on the
    /// latest render.
    pub fn use_event<A, R, F>(&mut self, f: F) -> StableFn<A, R>
    where
        A: ?Sized + 'static,
        R: 'static,
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        let (_, slot) = self.next_slot(|| None::<StableFn<A, R>>);
        if let Some(stable) = slot.as_ref() {
            stable.replace(f);
            return stable.clone();
        }
        let stable = StableFn::new(f);
        *slot = Some(stable.clone());
        stable
    }

    /// Read an ambient channel and subscribe this instance to changes of the
    /// value it resolves to.
    pub fn read<T>(&mut self, channel: &AmbientChannel<T>) -> T
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let (value, version) = channel.resolve(self.scope);
        let read = ChannelRead {
            channel: channel.id(),
            version,
        };
        if !self.state.reads.contains(&read) {
            self.state.reads.push(read);
        }
        value
    }

    /// Provide `value` on `channel` to every descendant of this instance.
    pub fn provide<T>(&mut self, channel: &AmbientChannel<T>, value: T)
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let entry = provide_value(self.state.provided.get(&channel.id()), value);
        self.state.next_provided.insert(channel.id(), entry);
    }
}

impl fmt::Debug for RenderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("instance", &self.instance)
            .field("component", &self.element.component.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_shares_state_between_clones() {
        let slot = Slot::new(1);
        let other = slot.clone();

        other.set(5);
        assert_eq!(slot.get(), 5);
        assert_eq!(slot.replace(6), 5);
        assert_eq!(slot.update(|v| {
            *v += 1;
            *v
        }), 7);
    }

    #[test]
    fn by_address_ignores_content() {
        let a = Arc::new(vec![1, 2, 3]);
        let b = Arc::new(vec![1, 2, 3]);

        assert_eq!(ByAddress(Arc::clone(&a)), ByAddress(Arc::clone(&a)));
        assert_ne!(ByAddress(a), ByAddress(b));
    }

    #[test]
    fn hook_state_swaps_provided_values_on_finish() {
        let channel = AmbientChannel::new(0u8);
        let mut state = HookState::default();

        state.begin();
        let entry = provide_value(None, 3u8);
        state.next_provided.insert(channel.id(), entry);
        state.finish("Test", false);
        assert_eq!(state.provided().len(), 1);

        state.begin();
        state.finish("Test", false);
        assert!(state.provided().is_empty());
    }
}
