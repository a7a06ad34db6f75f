//! Update Scheduler
//!
//! The scheduler collects re-render requests and decides when they are
//! flushed.
//!
//! # Algorithm
//!
//! 1. A state setter or forced update enqueues its instance. The queue is a
//!    set, so any number of requests for one instance collapse into one.
//! 2. If the engine is idle (no pass running, no open batch) the request is
//!    flushed right away.
//! 3. Otherwise the request waits. A running flush picks it up with its next
//!    pass; a batch flushes when its outermost scope closes.
//!
//! This is what coalesces the listener fan-out of a provider into a single
//! follow-up render pass.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Weak;

use indexmap::IndexSet;
use parking_lot::Mutex;

use super::id::InstanceId;
use super::renderer::Engine;

/// Pending updates plus the flags that decide when they flush.
#[derive(Default)]
pub(crate) struct Scheduler {
    pending: Mutex<IndexSet<InstanceId>>,
    batch_depth: AtomicUsize,
    flushing: AtomicBool,
}

impl Scheduler {
    /// Queue `instance` for re-render. Returns false if it was already queued.
    pub(crate) fn enqueue(&self, instance: InstanceId) -> bool {
        self.pending.lock().insert(instance)
    }

    /// Take every queued instance, in request order.
    pub(crate) fn drain(&self) -> Vec<InstanceId> {
        self.pending.lock().drain(..).collect()
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    pub(crate) fn in_batch(&self) -> bool {
        self.batch_depth.load(Ordering::SeqCst) > 0
    }

    pub(crate) fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::SeqCst)
    }

    /// Whether a new request should flush immediately.
    pub(crate) fn is_idle(&self) -> bool {
        !self.in_batch() && !self.is_flushing()
    }

    /// Open a batch. Requests are held until the guard drops.
    pub(crate) fn enter_batch(&self) -> BatchGuard<'_> {
        self.batch_depth.fetch_add(1, Ordering::SeqCst);
        BatchGuard { scheduler: self }
    }

    /// Mark a flush as running until the guard drops.
    pub(crate) fn enter_flush(&self) -> FlushGuard<'_> {
        self.flushing.store(true, Ordering::SeqCst);
        FlushGuard { scheduler: self }
    }
}

/// Closes a batch when dropped, even if the batched closure panics.
pub(crate) struct BatchGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.batch_depth.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Clears the flushing flag when dropped.
pub(crate) struct FlushGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.flushing.store(false, Ordering::SeqCst);
    }
}

/// Runs closures so that every update they request lands in one render pass.
///
/// Obtained from [`Renderer::batcher`](super::Renderer::batcher) or
/// [`RenderContext::batcher`](super::RenderContext::batcher).
#[derive(Clone)]
pub struct Batcher {
    engine: Weak<Engine>,
}

impl Batcher {
    pub(crate) fn new(engine: Weak<Engine>) -> Self {
        Self { engine }
    }

    /// Run `f` inside a batch.
    ///
    /// When the outermost batch closes and no pass is running, the collected
    /// updates are flushed before this returns. If the renderer is gone `f`
    /// simply runs.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let Some(engine) = self.engine.upgrade() else {
            return f();
        };

        let result = {
            let _batch = engine.scheduler().enter_batch();
            f()
        };

        engine.flush_if_idle();
        result
    }
}

impl fmt::Debug for Batcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batcher")
            .field("attached", &(self.engine.strong_count() > 0))
            .finish()
    }
}
