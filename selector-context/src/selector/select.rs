//! Consumer hooks.
//!
//! All three hooks share one subscription routine: project the current value
//! during render, cache the projection, and register a listener on the
//! provider's holder that compares each new projection with the cache. They
//! differ only in the projection and the equality used.
//!
//! | hook                     | projection                | equality          |
//! |--------------------------|---------------------------|-------------------|
//! | [`use_context`]          | the value itself          | `Arc` identity    |
//! | [`use_context_selector`] | a closure                 | `PartialEq`       |
//! | [`use_context_keys`]     | named fields of its JSON  | `Value` equality  |

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use smallvec::SmallVec;

use super::{SelectorContext, SharedValueHolder};
use crate::host::{Cleanup, RenderContext};

/// Field-based selection over the JSON view of a context value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelector {
    /// The value of a single field. A missing field selects nothing.
    Prop(String),

    /// An object holding the listed fields. Missing fields are left out.
    Pick(SmallVec<[String; 4]>),
}

impl KeySelector {
    /// Apply the selection to `value`.
    pub fn project(&self, value: &Value) -> Option<Value> {
        match self {
            KeySelector::Prop(key) => value.get(key).cloned(),
            KeySelector::Pick(keys) => {
                let picked: Map<String, Value> = keys
                    .iter()
                    .filter_map(|key| value.get(key).map(|field| (key.clone(), field.clone())))
                    .collect();
                Some(Value::Object(picked))
            }
        }
    }
}

impl From<&str> for KeySelector {
    fn from(key: &str) -> Self {
        KeySelector::Prop(key.to_owned())
    }
}

impl From<String> for KeySelector {
    fn from(key: String) -> Self {
        KeySelector::Prop(key)
    }
}

impl From<&[&str]> for KeySelector {
    fn from(keys: &[&str]) -> Self {
        KeySelector::Pick(keys.iter().map(|key| (*key).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for KeySelector {
    fn from(keys: [&str; N]) -> Self {
        KeySelector::from(&keys[..])
    }
}

impl From<Vec<String>> for KeySelector {
    fn from(keys: Vec<String>) -> Self {
        KeySelector::Pick(keys.into_iter().collect())
    }
}

/// Subscribe to the whole context value.
///
/// Re-renders only when the provider is given a different `Arc`; a new
/// allocation with equal contents counts as a change.
pub fn use_context<T>(cx: &mut RenderContext<'_>, context: &SelectorContext<T>) -> Option<Arc<T>>
where
    T: Send + Sync + 'static,
{
    use_projection(
        cx,
        context,
        |value: &Arc<T>| Arc::clone(value),
        |prev, next| Arc::ptr_eq(prev, next),
    )
}

/// Subscribe to the result of `select`.
///
/// Re-renders only when the selected value changes by `PartialEq`. The
/// closure may capture render-local state; the latest one is always used.
pub fn use_context_selector<T, S, F>(
    cx: &mut RenderContext<'_>,
    context: &SelectorContext<T>,
    select: F,
) -> Option<S>
where
    T: Send + Sync + 'static,
    S: Clone + PartialEq + Send + 'static,
    F: Fn(&T) -> S + Send + Sync + 'static,
{
    use_projection(cx, context, move |value: &Arc<T>| select(&**value), PartialEq::eq)
}

/// Subscribe to one field, or a set of fields, of the context value.
///
/// ```rust,ignore
/// let name = use_context_keys(cx, &user, "name");
/// let summary = use_context_keys(cx, &user, ["name", "age"]);
/// ```
pub fn use_context_keys<T>(
    cx: &mut RenderContext<'_>,
    context: &SelectorContext<T>,
    keys: impl Into<KeySelector>,
) -> Option<Value>
where
    T: Serialize + Send + Sync + 'static,
{
    let keys = keys.into();
    use_projection(
        cx,
        context,
        move |value: &Arc<T>| project_keys(&**value, &keys),
        PartialEq::eq,
    )
    .flatten()
}

/// The holder of the nearest provider, without subscribing to it.
///
/// Returns `None` outside any provider of `context`.
pub fn use_holder<T>(
    cx: &mut RenderContext<'_>,
    context: &SelectorContext<T>,
) -> Option<Arc<SharedValueHolder<T>>>
where
    T: Send + Sync + 'static,
{
    cx.read(context.channel()).map(|holder| holder.0)
}

fn project_keys<T: Serialize>(value: &T, keys: &KeySelector) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(json) => keys.project(&json),
        Err(err) => {
            tracing::warn!(error = %err, "context value has no JSON view, selecting nothing");
            None
        }
    }
}

fn use_projection<T, S, F>(
    cx: &mut RenderContext<'_>,
    context: &SelectorContext<T>,
    project: F,
    equal: fn(&S, &S) -> bool,
) -> Option<S>
where
    T: Send + Sync + 'static,
    S: Clone + Send + 'static,
    F: Fn(&Arc<T>) -> S + Send + Sync + 'static,
{
    let holder = cx.read(context.channel());
    let projection = cx.use_event::<Arc<T>, S, F>(project);
    let cached = cx.use_ref(|| None::<S>);
    let force = cx.use_force_update();

    // Outside a provider the default is read once and never subscribed to.
    let selected = match &holder {
        Some(holder) => Some(projection.call(&holder.current())),
        None => context.default_value().map(|value| projection.call(value)),
    };
    cached.set(selected.clone());

    let subscription = holder.clone();
    cx.use_layout_effect(holder, move || {
        let holder = subscription?;
        let id = holder.subscribe(move |value: &Arc<T>| {
            let next = projection.call(value);
            let unchanged = cached
                .lock()
                .as_ref()
                .is_some_and(|prev| equal(prev, &next));
            if !unchanged {
                force.request();
            }
        });
        Some(Box::new(move || {
            holder.unsubscribe(id);
        }) as Cleanup)
    });

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prop_selects_a_single_field() {
        let user = json!({ "name": "bamboo", "age": 20 });

        assert_eq!(KeySelector::from("name").project(&user), Some(json!("bamboo")));
        assert_eq!(KeySelector::from("missing").project(&user), None);
    }

    #[test]
    fn pick_keeps_only_listed_fields() {
        let user = json!({ "name": "bamboo", "age": 20, "city": "hz" });
        let picked = KeySelector::from(["name", "age", "missing"]).project(&user);

        assert_eq!(picked, Some(json!({ "name": "bamboo", "age": 20 })));
    }

    #[test]
    fn null_field_is_not_missing() {
        let user = json!({ "name": null });

        assert_eq!(KeySelector::from("name").project(&user), Some(Value::Null));
    }

    #[test]
    fn conversions_pick_the_right_variant() {
        assert_eq!(KeySelector::from(String::from("a")), KeySelector::Prop("a".into()));

        let keys: &[&str] = &["a", "b"];
        let from_slice = KeySelector::from(keys);
        let from_vec = KeySelector::from(vec![String::from("a"), String::from("b")]);
        assert_eq!(from_slice, from_vec);
    }

    #[test]
    fn unserializable_values_select_nothing() {
        use std::collections::HashMap;

        let mut value = HashMap::new();
        value.insert((1, 2), "tuple keys have no JSON form");

        assert_eq!(project_keys(&value, &KeySelector::from("x")), None);
    }
}
