//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use selector_context::host::{Component, Setter};

/// Render counts and rendered values, keyed by a test-chosen ID.
#[derive(Clone, Default)]
pub struct RenderLog {
    inner: Arc<Mutex<LogInner>>,
}

#[derive(Default)]
struct LogInner {
    renders: HashMap<String, usize>,
    values: HashMap<String, Value>,
}

impl RenderLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one render of `id`.
    pub fn tick(&self, id: &str) {
        *self.inner.lock().renders.entry(id.to_owned()).or_default() += 1;
    }

    pub fn times(&self, id: &str) -> usize {
        self.inner.lock().renders.get(id).copied().unwrap_or(0)
    }

    /// Remember what `id` rendered, as JSON.
    pub fn record<T: Serialize + ?Sized>(&self, id: &str, value: &T) {
        let value = serde_json::to_value(value).expect("test values serialize");
        self.inner.lock().values.insert(id.to_owned(), value);
    }

    pub fn value(&self, id: &str) -> Option<Value> {
        self.inner.lock().values.get(id).cloned()
    }

    /// A component that counts its own renders under the ID it is given.
    pub fn timer(&self) -> Component<&'static str> {
        let log = self.clone();
        Component::new("RenderTimer", move |_cx, id: &&'static str| {
            log.tick(id);
            Vec::new()
        })
    }
}

/// Holds the latest setter a component handed out during render.
pub struct Capture<T> {
    setter: Arc<Mutex<Option<Setter<T>>>>,
}

impl<T> Capture<T> {
    pub fn new() -> Self {
        Self {
            setter: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self, setter: Setter<T>) {
        *self.setter.lock() = Some(setter);
    }

    pub fn get(&self) -> Setter<T> {
        self.setter
            .lock()
            .clone()
            .expect("component rendered and stored its setter")
    }
}

impl<T> Clone for Capture<T> {
    fn clone(&self) -> Self {
        Self {
            setter: Arc::clone(&self.setter),
        }
    }
}
