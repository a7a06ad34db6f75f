//! Immutability Marker
//!
//! A root/response pair that lets a subtree of memoized components follow
//! the re-renders of one root without comparing props on every node in
//! between.
//!
//! # How It Works
//!
//! 1. [`Immutable::make_root`] wraps a component. Each time the wrapper
//!    renders it bumps a per-instance counter and provides the count on the
//!    marker channel.
//!
//! 2. [`Immutable::respond_to_root`] wraps a component in a memo boundary and
//!    reads the marker on every render. The memo skips prop churn from the
//!    parent; the read re-renders the component whenever the nearest root's
//!    count moves.
//!
//! 3. A root that finds a marker already provided above it defers to that
//!    ancestor: it renders its component unwrapped and neither counts nor
//!    provides.
//!
//! The marker value only orders re-renders. Read it with
//! [`Immutable::use_mark`] to key effects or caches, not for its number.
//!
//! # Example
//!
//! ```rust,ignore
//! let immutable = create_immutable();
//!
//! let table = immutable.make_root(&table);
//! let row = immutable.respond_to_root(&row);
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::host::{AmbientChannel, Component, Props, RenderContext};

/// Decides from previous and next props whether a root counts a render.
pub type CompareProps<P> = dyn Fn(&P, &P) -> bool + Send + Sync;

/// One independent marker channel with its root and response wrappers.
#[derive(Clone)]
pub struct Immutable {
    channel: AmbientChannel<Option<u64>>,
}

/// Create an independent marker. Roots of one marker are invisible to the
/// responses of another.
pub fn create_immutable() -> Immutable {
    Immutable::new()
}

impl Immutable {
    pub fn new() -> Self {
        Self {
            channel: AmbientChannel::new(None),
        }
    }

    /// The marker provided by the nearest root above this instance.
    pub fn use_mark(&self, cx: &mut RenderContext<'_>) -> Option<u64> {
        cx.read(&self.channel)
    }

    /// Wrap `component` so that every render of the wrapper signals its
    /// responses to re-render.
    pub fn make_root<P>(&self, component: &Component<P>) -> Component<P>
    where
        P: Send + Sync + 'static,
    {
        self.root(component, None)
    }

    /// Like [`make_root`](Self::make_root), but a render only signals when
    /// `should_trigger_render(prev_props, next_props)` holds.
    pub fn make_root_with<P, G>(&self, component: &Component<P>, should_trigger_render: G) -> Component<P>
    where
        P: Send + Sync + 'static,
        G: Fn(&P, &P) -> bool + Send + Sync + 'static,
    {
        self.root(component, Some(Box::new(should_trigger_render)))
    }

    fn root<P>(&self, component: &Component<P>, gate: Option<Box<CompareProps<P>>>) -> Component<P>
    where
        P: Send + Sync + 'static,
    {
        let channel = self.channel.clone();
        let inner = component.clone();
        let name = format!("ImmutableRoot({})", component.name());

        Component::from_erased(name, component.accepts_handle(), None, move |cx, props: &Props| {
            let render_times = cx.use_ref(|| 0u64);
            let prev_props = cx.use_ref(|| Arc::clone(props));
            let mark = cx.read(&channel);

            let element = inner.element_from(
                Arc::clone(props),
                cx.children().to_vec(),
                cx.handle().cloned(),
            );

            // An enclosing root already drives the responses below.
            if mark.is_some() {
                return vec![element];
            }

            let trigger = match &gate {
                None => true,
                Some(gate) => {
                    let prev = prev_props.get();
                    match (prev.downcast_ref::<P>(), props.downcast_ref::<P>()) {
                        (Some(prev), Some(next)) => gate(prev, next),
                        _ => true,
                    }
                }
            };
            let count = render_times.update(|count| {
                if trigger {
                    *count += 1;
                }
                *count
            });
            prev_props.set(Arc::clone(props));

            cx.provide(&channel, Some(count));
            vec![element]
        })
    }

    /// Wrap `component` in a memo boundary (by `PartialEq` on its props) that
    /// still re-renders whenever the nearest root does.
    pub fn respond_to_root<P>(&self, component: &Component<P>) -> Component<P>
    where
        P: PartialEq + Send + Sync + 'static,
    {
        self.response(component, |prev: &P, next: &P| prev == next)
    }

    /// Like [`respond_to_root`](Self::respond_to_root) with a custom props
    /// comparison.
    pub fn respond_to_root_with<P, E>(&self, component: &Component<P>, props_are_equal: E) -> Component<P>
    where
        P: Send + Sync + 'static,
        E: Fn(&P, &P) -> bool + Send + Sync + 'static,
    {
        self.response(component, props_are_equal)
    }

    fn response<P, E>(&self, component: &Component<P>, props_are_equal: E) -> Component<P>
    where
        P: Send + Sync + 'static,
        E: Fn(&P, &P) -> bool + Send + Sync + 'static,
    {
        let channel = self.channel.clone();
        let inner = component.clone();
        let name = format!("ImmutableResponse({})", component.name());

        let memo = move |prev: &Props, next: &Props| {
            match (prev.downcast_ref::<P>(), next.downcast_ref::<P>()) {
                (Some(prev), Some(next)) => props_are_equal(prev, next),
                _ => false,
            }
        };

        Component::from_erased(
            name,
            component.accepts_handle(),
            Some(Box::new(memo)),
            move |cx, props: &Props| {
                cx.read(&channel);
                vec![inner.element_from(
                    Arc::clone(props),
                    cx.children().to_vec(),
                    cx.handle().cloned(),
                )]
            },
        )
    }
}

impl Default for Immutable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Immutable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Immutable")
            .field("channel", &self.channel)
            .finish()
    }
}

/// The process-wide marker behind the free functions below. Created on first
/// use and never replaced.
pub fn default_immutable() -> &'static Immutable {
    static DEFAULT: OnceLock<Immutable> = OnceLock::new();
    DEFAULT.get_or_init(Immutable::new)
}

/// [`Immutable::make_root`] on the process-wide marker.
pub fn make_root<P>(component: &Component<P>) -> Component<P>
where
    P: Send + Sync + 'static,
{
    default_immutable().make_root(component)
}

/// [`Immutable::make_root_with`] on the process-wide marker.
pub fn make_root_with<P, G>(component: &Component<P>, should_trigger_render: G) -> Component<P>
where
    P: Send + Sync + 'static,
    G: Fn(&P, &P) -> bool + Send + Sync + 'static,
{
    default_immutable().make_root_with(component, should_trigger_render)
}

/// [`Immutable::respond_to_root`] on the process-wide marker.
pub fn respond_to_root<P>(component: &Component<P>) -> Component<P>
where
    P: PartialEq + Send + Sync + 'static,
{
    default_immutable().respond_to_root(component)
}

/// [`Immutable::respond_to_root_with`] on the process-wide marker.
pub fn respond_to_root_with<P, E>(component: &Component<P>, props_are_equal: E) -> Component<P>
where
    P: Send + Sync + 'static,
    E: Fn(&P, &P) -> bool + Send + Sync + 'static,
{
    default_immutable().respond_to_root_with(component, props_are_equal)
}

/// [`Immutable::use_mark`] on the process-wide marker.
pub fn use_immutable_mark(cx: &mut RenderContext<'_>) -> Option<u64> {
    default_immutable().use_mark(cx)
}
