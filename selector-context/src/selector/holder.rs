//! Shared value holder.
//!
//! One holder exists per mounted provider. It keeps the latest value the
//! provider rendered with and the listeners of every consumer below it.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::host::ListenerId;

/// Callback run with each new value the provider publishes.
pub type Trigger<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

/// The latest provided value plus the registered listeners.
pub struct SharedValueHolder<T> {
    current: Mutex<Arc<T>>,
    listeners: Mutex<IndexMap<ListenerId, Trigger<T>>>,
}

impl<T> SharedValueHolder<T> {
    pub(crate) fn new(value: Arc<T>) -> Self {
        Self {
            current: Mutex::new(value),
            listeners: Mutex::new(IndexMap::new()),
        }
    }

    /// The value the provider rendered with most recently.
    pub fn current(&self) -> Arc<T> {
        Arc::clone(&self.current.lock())
    }

    pub(crate) fn replace(&self, value: Arc<T>) -> Arc<T> {
        std::mem::replace(&mut *self.current.lock(), value)
    }

    /// Register a listener. It runs on every later notification until
    /// [`unsubscribe`](Self::unsubscribe) is called with the returned ID.
    pub fn subscribe<F>(&self, trigger: F) -> ListenerId
    where
        F: Fn(&Arc<T>) + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        self.listeners.lock().insert(id, Arc::new(trigger));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.lock().shift_remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Run every listener registered right now with `value`, in registration
    /// order. Returns how many ran.
    ///
    /// Listeners work on a snapshot taken before the first call, so they may
    /// subscribe or unsubscribe freely. Listeners added meanwhile wait for the
    /// next notification.
    pub fn notify(&self, value: &Arc<T>) -> usize {
        let snapshot: Vec<Trigger<T>> = self.listeners.lock().values().cloned().collect();
        for trigger in &snapshot {
            trigger(value);
        }
        snapshot.len()
    }
}

impl<T> fmt::Debug for SharedValueHolder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedValueHolder")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
