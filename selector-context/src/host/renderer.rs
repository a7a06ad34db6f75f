//! Renderer
//!
//! The renderer owns the instance tree and drives render passes. It is the
//! central coordinator that connects elements, hooks, ambient channels and
//! the update scheduler.
//!
//! # How a Pass Works
//!
//! 1. Queued updates are drained and their instances marked dirty.
//!
//! 2. The tree is walked from the roots. Each instance either renders (dirty,
//!    new element without a holding memo boundary, or a stale ambient read)
//!    or bails out. A bail-out keeps the previous children but the walk still
//!    descends, so dirty or ambient-dependent descendants are found.
//!
//! 3. A rendered instance's children are reconciled by key (or position) and
//!    component identity. Unmatched instances unmount immediately, running
//!    their effect cleanups.
//!
//! 4. Commit: queued layout effects run, children before parents.
//!
//! Updates requested during steps 2–4 are collected by the scheduler and
//! flushed as the next pass of the same flush.
//!
//! # Threading
//!
//! The tree sits behind a mutex so that handles (setters, batchers) can be
//! `Send + Sync`, but a renderer is meant to be driven from one thread.
//! Driving it re-entrantly from inside a render or effect is rejected with
//! [`HostError::Reentrant`] instead of deadlocking.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::effect::PendingEffect;
use super::element::Element;
use super::hooks::RenderContext;
use super::id::InstanceId;
use super::instance::{Instance, RenderReason};
use super::scheduler::{Batcher, Scheduler};
use super::scope::Scope;
use crate::config::EngineConfig;
use crate::error::{HostError, Result};

/// State shared between a [`Renderer`] and the handles it gives out.
pub(crate) struct Engine {
    tree: Mutex<Tree>,
    scheduler: Scheduler,
    config: EngineConfig,
    passes: AtomicU64,
    this: Weak<Engine>,
}

impl Engine {
    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Queue `instance` for re-render and flush if nothing else is running.
    pub(crate) fn request_update(&self, instance: InstanceId) {
        self.scheduler.enqueue(instance);
        self.flush_if_idle();
    }

    /// Flush queued updates unless a batch or a flush is already open.
    ///
    /// Callers on this path have no way to receive an error, so failures are
    /// logged.
    pub(crate) fn flush_if_idle(&self) {
        if !self.scheduler.is_idle() || !self.scheduler.has_pending() {
            return;
        }
        if let Err(err) = self.flush() {
            tracing::error!(error = %err, "flushing requested updates failed");
        }
    }

    /// Run passes until no root change and no update is pending.
    fn flush(&self) -> Result<()> {
        let mut tree = self.tree.try_lock().ok_or(HostError::Reentrant)?;
        let _flushing = self.scheduler.enter_flush();

        let limit = self.config.max_passes;
        let mut passes = 0;
        while tree.next_root.is_some() || self.scheduler.has_pending() {
            if passes == limit {
                let dropped = self.scheduler.drain().len();
                tracing::error!(limit, dropped, "update depth exceeded, dropping pending updates");
                return Err(HostError::UpdateDepthExceeded { limit });
            }
            passes += 1;
            self.run_pass(&mut tree);
        }
        Ok(())
    }

    fn run_pass(&self, tree: &mut Tree) {
        for id in self.scheduler.drain() {
            if let Some(instance) = tree.nodes.get_mut(&id) {
                instance.mark_dirty();
            }
        }

        let mut pass = Pass {
            engine: self,
            effects: Vec::new(),
            rendered: 0,
            unmounted: 0,
        };
        let scope = Scope::default();

        match tree.next_root.take() {
            Some(element) => pass.reconcile(tree, None, vec![element], &scope),
            None => {
                for id in tree.roots.clone() {
                    let element = tree.nodes.get(&id).map(|node| node.element.clone());
                    if let Some(element) = element {
                        pass.visit(tree, id, element, &scope);
                    }
                }
            }
        }

        let rendered = pass.rendered;
        let unmounted = pass.unmounted;
        let effects = pass.effects.len();
        pass.commit(tree);

        let number = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(pass = number, rendered, unmounted, effects, "render pass committed");
    }
}

#[derive(Default)]
struct Tree {
    nodes: HashMap<InstanceId, Instance>,
    roots: Vec<InstanceId>,
    next_root: Option<Element>,
}

impl Tree {
    /// Remove `id` and its descendants, running their cleanups children
    /// first, in the same order their effects were committed.
    /// Returns the number of removed instances.
    fn unmount(&mut self, id: InstanceId) -> usize {
        let Some(mut instance) = self.nodes.remove(&id) else {
            return 0;
        };

        let descendants = instance
            .children
            .iter()
            .map(|child| self.unmount(*child))
            .sum::<usize>();

        tracing::trace!(
            component = instance.element.component_name(),
            instance = id.raw(),
            cleanups = instance.cleanups.len(),
            "unmounting"
        );
        instance.cleanups.run_all();

        1 + descendants
    }
}

/// Position of a child for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ChildKey {
    /// An explicit key and its occurrence among siblings sharing it.
    Keyed(String, usize),
    Indexed(usize),
}

impl ChildKey {
    fn is_duplicate(&self) -> bool {
        matches!(self, ChildKey::Keyed(_, occurrence) if *occurrence > 0)
    }
}

/// Assigns keys to one list of siblings.
///
/// Siblings repeating a key are told apart by occurrence, so the n-th `"a"`
/// of the old list matches the n-th `"a"` of the new one.
#[derive(Default)]
struct ChildKeys {
    seen: HashMap<String, usize>,
}

impl ChildKeys {
    fn next(&mut self, element: &Element, index: usize) -> ChildKey {
        match element.key() {
            Some(key) => {
                let seen = self.seen.entry(key.to_owned()).or_default();
                let occurrence = *seen;
                *seen += 1;
                ChildKey::Keyed(key.to_owned(), occurrence)
            }
            None => ChildKey::Indexed(index),
        }
    }
}

/// Work state of one render pass.
struct Pass<'e> {
    engine: &'e Engine,
    effects: Vec<PendingEffect>,
    rendered: usize,
    unmounted: usize,
}

impl Pass<'_> {
    fn visit(&mut self, tree: &mut Tree, id: InstanceId, element: Element, scope: &Scope) {
        let Some(instance) = tree.nodes.get_mut(&id) else {
            return;
        };

        match instance.render_reason(&element, scope) {
            Some(reason) => {
                instance.element = element;
                let (children, own_effects) = self.render(instance, scope, reason);
                let child_scope = scope.extend(instance.state.provided());
                self.reconcile(tree, Some(id), children, &child_scope);
                // Parents commit after their children.
                self.effects.extend(own_effects);
            }
            None => {
                instance.element = element;
                let child_scope = scope.extend(instance.state.provided());
                let child_ids = instance.children.clone();
                for child in child_ids {
                    let element = tree.nodes.get(&child).map(|node| node.element.clone());
                    if let Some(element) = element {
                        self.visit(tree, child, element, &child_scope);
                    }
                }
            }
        }
    }

    fn render(
        &mut self,
        instance: &mut Instance,
        scope: &Scope,
        reason: RenderReason,
    ) -> (Vec<Element>, Vec<PendingEffect>) {
        let element = instance.element.clone();
        let inner = &*element.inner;
        let component = inner.component.name();
        let dev_warnings = self.engine.config.dev_warnings;

        if dev_warnings && inner.handle.is_some() && !inner.component.accepts_handle() {
            tracing::warn!(component, "handle given to a component that cannot accept one, ignoring it");
        }
        tracing::trace!(component, instance = instance.id().raw(), ?reason, "rendering");

        let mut effects = Vec::new();
        instance.state.begin();
        let children = {
            let mut cx = RenderContext::new(
                instance.id(),
                &mut instance.state,
                scope,
                inner,
                &mut effects,
                &self.engine.this,
            );
            inner.component.render(&mut cx, &inner.props)
        };
        instance.state.finish(component, dev_warnings);
        instance.mark_clean();
        self.rendered += 1;

        (children, effects)
    }

    fn reconcile(
        &mut self,
        tree: &mut Tree,
        parent: Option<InstanceId>,
        elements: Vec<Element>,
        scope: &Scope,
    ) {
        let previous = match parent {
            Some(id) => tree
                .nodes
                .get(&id)
                .map(|node| node.children.clone())
                .unwrap_or_default(),
            None => tree.roots.clone(),
        };

        let mut old_keys = ChildKeys::default();
        let mut by_key: IndexMap<ChildKey, InstanceId> = previous
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                tree.nodes
                    .get(id)
                    .map(|node| (old_keys.next(&node.element, index), *id))
            })
            .collect();

        let mut new_keys = ChildKeys::default();
        let mut next = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let key = new_keys.next(&element, index);
            if self.engine.config.dev_warnings && key.is_duplicate() {
                tracing::warn!(
                    component = element.component_name(),
                    key = element.key(),
                    "siblings share a key, matching them by occurrence"
                );
            }
            let matched = by_key.swap_remove(&key);
            let id = match matched {
                Some(id)
                    if tree
                        .nodes
                        .get(&id)
                        .is_some_and(|node| node.element.component_id() == element.component_id()) =>
                {
                    id
                }
                other => {
                    if let Some(replaced) = other {
                        self.unmounted += tree.unmount(replaced);
                    }
                    let instance = Instance::new(element.clone());
                    let id = instance.id();
                    tree.nodes.insert(id, instance);
                    id
                }
            };
            next.push(id);
            self.visit(tree, id, element, scope);
        }

        for (_, stale) in by_key {
            self.unmounted += tree.unmount(stale);
        }

        match parent {
            Some(id) => {
                if let Some(node) = tree.nodes.get_mut(&id) {
                    node.children = next;
                }
            }
            None => tree.roots = next,
        }
    }

    fn commit(self, tree: &mut Tree) {
        for effect in self.effects {
            // The instance may have been replaced later in the same pass.
            if let Some(instance) = tree.nodes.get_mut(&effect.instance) {
                instance.cleanups.rerun(effect.hook, effect.run);
            }
        }
    }
}

/// Owns a tree of component instances and renders it.
///
/// # Example
///
/// ```rust,ignore
/// let renderer = Renderer::new();
/// renderer.render(app.element(()))?;
///
/// // Group updates into one render pass
/// renderer.act(|| {
///     set_name.set("light".into());
///     set_age.set(20);
/// })?;
/// ```
pub struct Renderer {
    engine: Arc<Engine>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let engine = Arc::new_cyclic(|this| Engine {
            tree: Mutex::new(Tree::default()),
            scheduler: Scheduler::default(),
            config,
            passes: AtomicU64::new(0),
            this: this.clone(),
        });
        Self { engine }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.engine.config
    }

    /// Mount `element` as the root, or update the existing root with it.
    ///
    /// Inside [`Renderer::act`] the render is deferred to the end of the
    /// batch.
    pub fn render(&self, element: Element) -> Result<()> {
        self.engine
            .tree
            .try_lock()
            .ok_or(HostError::Reentrant)?
            .next_root = Some(element);

        if self.engine.scheduler.in_batch() {
            return Ok(());
        }
        self.engine.flush()
    }

    /// Run `f` as one batch and flush everything it requested.
    ///
    /// This is the entry point for simulated user events: any number of
    /// state updates inside `f` produce one render pass per flush step.
    pub fn act<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        if self.engine.scheduler.is_flushing() {
            return Err(HostError::Reentrant);
        }

        let result = {
            let _batch = self.engine.scheduler.enter_batch();
            f()
        };

        if !self.engine.scheduler.in_batch() {
            self.engine.flush()?;
        }
        Ok(result)
    }

    /// Unmount the whole tree, running every effect cleanup synchronously.
    pub fn unmount(&self) -> Result<()> {
        let mut tree = self.engine.tree.try_lock().ok_or(HostError::Reentrant)?;
        let _flushing = self.engine.scheduler.enter_flush();

        tree.next_root = None;
        let roots = std::mem::take(&mut tree.roots);
        let removed: usize = roots.into_iter().map(|id| tree.unmount(id)).sum();
        self.engine.scheduler.drain();

        tracing::debug!(removed, "renderer unmounted");
        Ok(())
    }

    /// A batching scope bound to this renderer.
    pub fn batcher(&self) -> Batcher {
        Batcher::new(Arc::downgrade(&self.engine))
    }

    /// Number of render passes committed so far.
    pub fn passes(&self) -> u64 {
        self.engine.passes.load(Ordering::SeqCst)
    }

    /// Number of mounted instances.
    ///
    /// Returns [`HostError::Reentrant`] when called from inside a render or
    /// effect of this renderer.
    pub fn instance_count(&self) -> Result<usize> {
        let tree = self.engine.tree.try_lock().ok_or(HostError::Reentrant)?;
        Ok(tree.nodes.len())
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(err) = self.unmount() {
            tracing::warn!(error = %err, "renderer dropped while busy, skipping cleanups");
        }
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("passes", &self.passes())
            .field("config", &self.engine.config)
            .finish()
    }
}
