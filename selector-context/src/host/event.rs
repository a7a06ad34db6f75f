//! Stable callbacks.
//!
//! A [`StableFn`] keeps one identity for the lifetime of the instance that
//! created it while always calling the closure passed on the most recent
//! render. It is a one-element cell holding the current closure plus a
//! dispatcher that reads the cell at call time.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

type Callback<A, R> = Arc<dyn Fn(&A) -> R + Send + Sync>;

/// A callback with stable identity that dispatches to its latest closure.
pub struct StableFn<A: ?Sized, R> {
    current: Arc<Mutex<Callback<A, R>>>,
}

impl<A: ?Sized, R> StableFn<A, R> {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        Self {
            current: Arc::new(Mutex::new(Arc::new(f))),
        }
    }

    pub(crate) fn replace<F>(&self, f: F)
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        *self.current.lock() = Arc::new(f);
    }

    /// Call the latest closure.
    ///
    /// The cell is released before the closure runs, so the closure may
    /// itself be replaced from inside the call.
    pub fn call(&self, arg: &A) -> R {
        let f = Arc::clone(&*self.current.lock());
        f(arg)
    }

    /// Whether both values are the same stable callback.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.current, &other.current)
    }
}

impl<A: ?Sized, R> Clone for StableFn<A, R> {
    fn clone(&self) -> Self {
        Self {
            current: Arc::clone(&self.current),
        }
    }
}

impl<A: ?Sized, R> fmt::Debug for StableFn<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StableFn").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_to_latest_closure() {
        let stable = StableFn::new(|x: &i32| x + 1);
        let held = stable.clone();
        assert_eq!(held.call(&1), 2);

        stable.replace(|x: &i32| x * 10);
        assert_eq!(held.call(&1), 10);
        assert!(held.same(&stable));
    }

    #[test]
    fn separate_cells_are_distinct() {
        let a = StableFn::new(|_: &()| ());
        let b = StableFn::new(|_: &()| ());
        assert!(!a.same(&b));
    }
}
