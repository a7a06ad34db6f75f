//! Layout Effects
//!
//! A layout effect is a side-effecting closure that runs after the render
//! pass that scheduled it has been committed.
//!
//! # How Effects Work
//!
//! 1. During render, `use_layout_effect(deps, f)` compares `deps` with the
//!    value stored for that hook. If they are equal nothing is scheduled.
//!
//! 2. Otherwise the closure is queued as a [`PendingEffect`] for the current
//!    pass. Effects of children are queued before the effects of their parent.
//!
//! 3. At commit, the cleanup returned by the previous run of the same hook is
//!    called first, then the new closure runs and its cleanup is stored.
//!
//! 4. When an instance unmounts every stored cleanup runs synchronously.

use indexmap::IndexMap;

use super::id::InstanceId;

/// Teardown returned by an effect.
pub type Cleanup = Box<dyn FnOnce() + Send>;

pub(crate) type EffectFn = Box<dyn FnOnce() -> Option<Cleanup> + Send>;

/// The dependency value stored in an effect's hook slot.
pub(crate) struct EffectDeps<D>(pub(crate) Option<D>);

impl<D: PartialEq> EffectDeps<D> {
    /// Store `next` and report whether the effect has to run again.
    pub(crate) fn update(&mut self, next: D) -> bool {
        if self.0.as_ref() == Some(&next) {
            return false;
        }
        self.0 = Some(next);
        true
    }
}

/// An effect queued during render, waiting for commit.
pub(crate) struct PendingEffect {
    pub(crate) instance: InstanceId,
    pub(crate) hook: usize,
    pub(crate) run: EffectFn,
}

/// Cleanups of one instance, keyed by hook index.
#[derive(Default)]
pub(crate) struct Cleanups {
    by_hook: IndexMap<usize, Cleanup>,
}

impl Cleanups {
    /// Run the cleanup of `hook` (if any), then `effect`, storing its cleanup.
    pub(crate) fn rerun(&mut self, hook: usize, effect: EffectFn) {
        if let Some(cleanup) = self.by_hook.swap_remove(&hook) {
            cleanup();
        }
        if let Some(cleanup) = effect() {
            self.by_hook.insert(hook, cleanup);
        }
    }

    /// Run every stored cleanup in hook order.
    pub(crate) fn run_all(&mut self) {
        self.by_hook.sort_keys();
        for (_, cleanup) in self.by_hook.drain(..) {
            cleanup();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.by_hook.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn deps_gate_reruns() {
        let mut deps = EffectDeps(None);

        assert!(deps.update(1));
        assert!(!deps.update(1));
        assert!(deps.update(2));
    }

    #[test]
    fn unit_deps_run_once() {
        let mut deps = EffectDeps(None);

        assert!(deps.update(()));
        assert!(!deps.update(()));
    }

    #[test]
    fn rerun_calls_previous_cleanup_first() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut cleanups = Cleanups::default();

        for round in 0..2 {
            let log_run = Arc::clone(&log);
            cleanups.rerun(
                0,
                Box::new(move || {
                    log_run.lock().push(format!("run {round}"));
                    let log_cleanup = Arc::clone(&log_run);
                    Some(Box::new(move || {
                        log_cleanup.lock().push(format!("cleanup {round}"));
                    }) as Cleanup)
                }),
            );
        }

        assert_eq!(*log.lock(), vec!["run 0", "cleanup 0", "run 1"]);
        assert_eq!(cleanups.len(), 1);
    }

    #[test]
    fn run_all_drains_cleanups() {
        let count = Arc::new(AtomicI32::new(0));
        let mut cleanups = Cleanups::default();

        for hook in 0..3 {
            let count = Arc::clone(&count);
            cleanups.rerun(
                hook,
                Box::new(move || {
                    Some(Box::new(move || {
                        count.fetch_add(1, Ordering::SeqCst);
                    }) as Cleanup)
                }),
            );
        }

        cleanups.run_all();
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(cleanups.len(), 0);
    }
}
