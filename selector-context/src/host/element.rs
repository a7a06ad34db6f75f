//! Components, Elements and Handles
//!
//! A [`Component`] is a named render function over a props type. Rendering a
//! component produces a list of child [`Element`]s, which the
//! [`Renderer`](super::Renderer) reconciles against the previous list.
//!
//! Elements are immutable and cheap to clone. Their identity is the address
//! of the shared allocation: re-using the same element (for example passing
//! `cx.children()` straight through) lets the renderer skip the subtree,
//! while building a new element for the same component always re-renders it
//! unless the component carries a memo predicate.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use super::hooks::RenderContext;
use super::id::ComponentId;

/// Type-erased props. Every element built from a `Component<P>` stores a `P`.
pub type Props = Arc<dyn Any + Send + Sync>;

pub(crate) type RenderFn = dyn Fn(&mut RenderContext<'_>, &Props) -> Vec<Element> + Send + Sync;
pub(crate) type PropsEq = dyn Fn(&Props, &Props) -> bool + Send + Sync;

/// The shared definition behind every clone of a [`Component`].
pub(crate) struct ComponentDef {
    id: ComponentId,
    name: String,
    render: Box<RenderFn>,
    memo: Option<Box<PropsEq>>,
    accepts_handle: bool,
}

impl ComponentDef {
    pub(crate) fn id(&self) -> ComponentId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn accepts_handle(&self) -> bool {
        self.accepts_handle
    }

    pub(crate) fn render(&self, cx: &mut RenderContext<'_>, props: &Props) -> Vec<Element> {
        (self.render)(cx, props)
    }

    /// Whether a memo boundary lets `next` reuse the output of `prev`.
    ///
    /// Components without a memo predicate never skip on props alone.
    pub(crate) fn props_unchanged(&self, prev: &Element, next: &Element) -> bool {
        match &self.memo {
            Some(equal) => {
                children_identical(&prev.inner.children, &next.inner.children)
                    && prev.inner.handle == next.inner.handle
                    && equal(&prev.inner.props, &next.inner.props)
            }
            None => false,
        }
    }
}

/// A renderable component with props of type `P`.
///
/// # Example
///
/// ```rust,ignore
/// let greeting = Component::new("Greeting", |cx, name: &String| {
///     let _count = cx.use_ref(|| 0u32);
///     Vec::new()
/// });
///
/// let element = greeting.element("bamboo".to_string());
/// ```
pub struct Component<P> {
    def: Arc<ComponentDef>,
    _props: PhantomData<fn(P)>,
}

impl<P> Component<P>
where
    P: Send + Sync + 'static,
{
    /// Create a component from a render function.
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&mut RenderContext<'_>, &P) -> Vec<Element> + Send + Sync + 'static,
    {
        Self::typed(name.into(), false, render)
    }

    /// Create a component that accepts an external [`Handle`].
    ///
    /// Inside the render function the handle is available through
    /// [`RenderContext::handle`]. Components created with [`Component::new`]
    /// never see a handle.
    pub fn forwarding<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&mut RenderContext<'_>, &P) -> Vec<Element> + Send + Sync + 'static,
    {
        Self::typed(name.into(), true, render)
    }

    fn typed<F>(name: String, accepts_handle: bool, render: F) -> Self
    where
        F: Fn(&mut RenderContext<'_>, &P) -> Vec<Element> + Send + Sync + 'static,
    {
        let component_name = name.clone();
        Self::from_erased(name, accepts_handle, None, move |cx, props| {
            match props.downcast_ref::<P>() {
                Some(props) => render(cx, props),
                None => {
                    tracing::error!(component = %component_name, "props type mismatch, rendering nothing");
                    Vec::new()
                }
            }
        })
    }

    /// Build a component directly over erased props.
    ///
    /// Wrappers use this to hand the very same props allocation to the
    /// component they wrap.
    pub(crate) fn from_erased<F>(
        name: String,
        accepts_handle: bool,
        memo: Option<Box<PropsEq>>,
        render: F,
    ) -> Self
    where
        F: Fn(&mut RenderContext<'_>, &Props) -> Vec<Element> + Send + Sync + 'static,
    {
        Self {
            def: Arc::new(ComponentDef {
                id: ComponentId::new(),
                name,
                render: Box::new(render),
                memo,
                accepts_handle,
            }),
            _props: PhantomData,
        }
    }

    /// Build an element rendering this component with `props`.
    pub fn element(&self, props: P) -> Element {
        self.element_from(Arc::new(props), Vec::new(), None)
    }

    pub(crate) fn element_from(
        &self,
        props: Props,
        children: Vec<Element>,
        handle: Option<Handle>,
    ) -> Element {
        Element {
            inner: Arc::new(ElementInner {
                component: Arc::clone(&self.def),
                props,
                children,
                key: None,
                handle,
            }),
        }
    }
}

impl<P> Component<P> {
    /// The component's display name.
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Whether elements of this component forward an external [`Handle`].
    pub fn accepts_handle(&self) -> bool {
        self.def.accepts_handle
    }
}

impl<P> Clone for Component<P> {
    fn clone(&self) -> Self {
        Self {
            def: Arc::clone(&self.def),
            _props: PhantomData,
        }
    }
}

impl<P> fmt::Debug for Component<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.def.name)
            .field("accepts_handle", &self.def.accepts_handle)
            .finish()
    }
}

#[derive(Clone)]
pub(crate) struct ElementInner {
    pub(crate) component: Arc<ComponentDef>,
    pub(crate) props: Props,
    pub(crate) children: Vec<Element>,
    pub(crate) key: Option<String>,
    pub(crate) handle: Option<Handle>,
}

/// An immutable description of one component to render.
#[derive(Clone)]
pub struct Element {
    pub(crate) inner: Arc<ElementInner>,
}

impl Element {
    /// Attach children. The rendered component reads them through
    /// [`RenderContext::children`].
    pub fn with_children(self, children: Vec<Element>) -> Self {
        self.map(|inner| inner.children = children)
    }

    /// Attach a reconciliation key.
    pub fn with_key(self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.map(|inner| inner.key = Some(key))
    }

    /// Attach an external handle.
    pub fn with_handle(self, handle: Handle) -> Self {
        self.map(|inner| inner.handle = Some(handle))
    }

    fn map(self, f: impl FnOnce(&mut ElementInner)) -> Self {
        let mut inner = Arc::unwrap_or_clone(self.inner);
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Whether two elements are the very same description.
    pub fn same(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The display name of the element's component.
    pub fn component_name(&self) -> &str {
        self.inner.component.name()
    }

    pub fn key(&self) -> Option<&str> {
        self.inner.key.as_deref()
    }

    pub(crate) fn component_id(&self) -> ComponentId {
        self.inner.component.id()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("component", &self.inner.component.name())
            .field("key", &self.inner.key)
            .field("children", &self.inner.children.len())
            .finish()
    }
}

fn children_identical(a: &[Element], b: &[Element]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same(b))
}

/// An external handle slot, the host's equivalent of a ref.
///
/// A component that accepts handles may expose any value through it; the
/// element's owner reads it back after rendering.
#[derive(Clone, Default)]
pub struct Handle {
    slot: Arc<Mutex<Option<Arc<dyn Any + Send + Sync>>>>,
}

impl Handle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` in the handle, replacing any previous value.
    pub fn expose<T: Any + Send + Sync>(&self, value: T) {
        *self.slot.lock() = Some(Arc::new(value));
    }

    /// Read the exposed value if it has type `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let current = self.slot.lock().clone()?;
        current.downcast::<T>().ok()
    }

    pub fn is_set(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub fn clear(&self) {
        self.slot.lock().take();
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").field("set", &self.is_set()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_identity_follows_allocation() {
        let leaf = Component::new("Leaf", |_cx, _props: &u32| Vec::new());

        let a = leaf.element(1);
        let b = a.clone();
        let c = leaf.element(1);

        assert!(a.same(&b));
        assert!(!a.same(&c));
        assert_eq!(a.component_id(), c.component_id());
    }

    #[test]
    fn builders_produce_new_elements() {
        let leaf = Component::new("Leaf", |_cx, _props: &()| Vec::new());
        let base = leaf.element(());
        let keyed = base.clone().with_key("k");

        assert!(!base.same(&keyed));
        assert_eq!(keyed.key(), Some("k"));
        assert_eq!(base.key(), None);
        assert_eq!(keyed.component_name(), "Leaf");
    }

    #[test]
    fn forwarding_marks_handle_capability() {
        let plain = Component::new("Plain", |_cx, _props: &()| Vec::new());
        let forwarding = Component::forwarding("Forwarding", |_cx, _props: &()| Vec::new());

        assert!(!plain.accepts_handle());
        assert!(forwarding.accepts_handle());
    }

    #[test]
    fn handle_exposes_typed_values() {
        let handle = Handle::new();
        assert!(!handle.is_set());

        handle.expose(String::from("root"));
        assert_eq!(handle.get::<String>().as_deref(), Some(&String::from("root")));
        assert!(handle.get::<u32>().is_none());

        handle.clear();
        assert!(!handle.is_set());
    }

    #[test]
    fn handles_compare_by_slot() {
        let a = Handle::new();
        let b = a.clone();
        let c = Handle::new();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
