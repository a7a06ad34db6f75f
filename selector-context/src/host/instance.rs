//! Mounted instances
//!
//! An [`Instance`] is one mounted component in the renderer's tree. It keeps
//! the element it last rendered, its hook state, its effect cleanups and the
//! IDs of its children.

use super::effect::Cleanups;
use super::element::Element;
use super::hooks::HookState;
use super::id::InstanceId;
use super::scope::Scope;

/// Why an instance has to render in the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderReason {
    /// First render, or a state update / forced update was requested.
    Dirty,

    /// The parent produced a different element and no memo boundary held.
    Props,

    /// An ambient channel this instance read resolves to a new value.
    Ambient,
}

pub(crate) struct Instance {
    id: InstanceId,
    pub(crate) element: Element,
    pub(crate) children: Vec<InstanceId>,
    pub(crate) state: HookState,
    pub(crate) cleanups: Cleanups,
    dirty: bool,
}

impl Instance {
    /// Create an instance for `element`. New instances start dirty so their
    /// first visit renders them.
    pub(crate) fn new(element: Element) -> Self {
        Self {
            id: InstanceId::new(),
            element,
            children: Vec::new(),
            state: HookState::default(),
            cleanups: Cleanups::default(),
            dirty: true,
        }
    }

    pub(crate) fn id(&self) -> InstanceId {
        self.id
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Decide whether visiting this instance with `next` in `scope` renders it.
    pub(crate) fn render_reason(&self, next: &Element, scope: &Scope) -> Option<RenderReason> {
        if self.dirty {
            return Some(RenderReason::Dirty);
        }

        let same_props = self.element.same(next)
            || next
                .inner
                .component
                .props_unchanged(&self.element, next);
        if !same_props {
            return Some(RenderReason::Props);
        }

        if self.state.reads_stale(scope) {
            return Some(RenderReason::Ambient);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Component;

    #[test]
    fn new_instances_start_dirty() {
        let leaf = Component::new("Leaf", |_cx, _props: &()| Vec::new());
        let element = leaf.element(());
        let instance = Instance::new(element.clone());

        assert_eq!(
            instance.render_reason(&element, &Scope::default()),
            Some(RenderReason::Dirty)
        );
    }

    #[test]
    fn same_element_bails_out() {
        let leaf = Component::new("Leaf", |_cx, _props: &()| Vec::new());
        let element = leaf.element(());
        let mut instance = Instance::new(element.clone());
        instance.mark_clean();

        assert_eq!(instance.render_reason(&element, &Scope::default()), None);
    }

    #[test]
    fn new_element_without_memo_renders() {
        let leaf = Component::new("Leaf", |_cx, _props: &u8| Vec::new());
        let mut instance = Instance::new(leaf.element(1));
        instance.mark_clean();

        assert_eq!(
            instance.render_reason(&leaf.element(1), &Scope::default()),
            Some(RenderReason::Props)
        );
    }
}
