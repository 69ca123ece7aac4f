use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::runtime::{NodeId, NodeKind, Refresh, Runtime};
use crate::subscription::Equality;

struct ComputedInner<T> {
    id: NodeId,
    rt: Weak<Runtime>,
    compute: Box<dyn Fn() -> T>,
    equality: Equality<T>,
    value: RefCell<Option<T>>,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        if let Some(rt) = self.rt.upgrade() {
            rt.release(self.id);
        }
    }
}

impl<T: 'static> Refresh for ComputedInner<T> {
    fn refresh(&self) {
        let Some(rt) = self.rt.upgrade() else {
            *self.value.borrow_mut() = Some((self.compute)());
            return;
        };
        let cached = self.value.borrow().is_some();
        if cached && rt.is_clean(self.id) {
            return;
        }
        if cached && !rt.sources_changed(self.id) {
            rt.mark_clean(self.id);
            return;
        }
        let next = rt.evaluate(self.id, || (self.compute)());
        let mut slot = self.value.borrow_mut();
        let changed = match slot.as_ref() {
            Some(previous) => !self.equality.eq(previous, &next),
            None => true,
        };
        // Equal results keep the old value and version, which stops the
        // change from reaching observers.
        if changed {
            *slot = Some(next);
            drop(slot);
            rt.bump(self.id);
        }
    }
}

/// Derived value cached until one of the cells it read changes.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Computed")
            .field(&*self.inner.value.borrow())
            .finish()
    }
}

impl<T: 'static> Computed<T> {
    pub(crate) fn new(
        rt: &Rc<Runtime>,
        equality: Equality<T>,
        compute: Box<dyn Fn() -> T>,
    ) -> Self {
        let id = rt.register(NodeKind::Computed);
        let inner = Rc::new(ComputedInner {
            id,
            rt: Rc::downgrade(rt),
            compute,
            equality,
            value: RefCell::new(None),
        });
        let refresh: Weak<dyn Refresh> = Rc::downgrade(&inner) as Weak<dyn Refresh>;
        rt.register_computed(id, refresh);
        Self { inner }
    }

    /// Reads the current value by reference, recomputing it first if needed.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        if let Some(rt) = self.inner.rt.upgrade() {
            rt.track(self.inner.id);
        }
        self.inner.refresh();
        let slot = self.inner.value.borrow();
        match slot.as_ref() {
            Some(value) => f(value),
            None => {
                drop(slot);
                f(&(self.inner.compute)())
            }
        }
    }
}

impl<T: Clone + 'static> Computed<T> {
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::Store;

    #[test]
    fn recomputes_only_after_a_dependency_changes() {
        let store = Store::new();
        let base = store.observable(2);
        let runs = Rc::new(Cell::new(0));
        let doubled = {
            let base = base.clone();
            let runs = runs.clone();
            store.computed(move || {
                runs.set(runs.get() + 1);
                base.get() * 2
            })
        };

        assert_eq!(doubled.get(), 4);
        assert_eq!(doubled.get(), 4);
        assert_eq!(runs.get(), 1);

        base.set(5);
        assert_eq!(doubled.get(), 10);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn unchanged_intermediate_values_stop_downstream_work() {
        let store = Store::new();
        let value = store.observable(3);
        let parity = {
            let value = value.clone();
            store.computed(move || value.get() % 2)
        };
        let label_runs = Rc::new(Cell::new(0));
        let label = {
            let parity = parity.clone();
            let label_runs = label_runs.clone();
            store.computed(move || {
                label_runs.set(label_runs.get() + 1);
                if parity.get() == 0 { "even" } else { "odd" }
            })
        };

        assert_eq!(label.get(), "odd");
        value.set(5);
        assert_eq!(label.get(), "odd");
        assert_eq!(label_runs.get(), 1);

        value.set(6);
        assert_eq!(label.get(), "even");
        assert_eq!(label_runs.get(), 2);
    }

    #[test]
    fn dependencies_follow_the_last_evaluation() {
        let store = Store::new();
        let use_left = store.observable(true);
        let left = store.observable(1);
        let right = store.observable(10);
        let runs = Rc::new(Cell::new(0));
        let picked = {
            let (use_left, left, right) = (use_left.clone(), left.clone(), right.clone());
            let runs = runs.clone();
            store.computed(move || {
                runs.set(runs.get() + 1);
                if use_left.get() { left.get() } else { right.get() }
            })
        };

        assert_eq!(picked.get(), 1);
        right.set(11);
        assert_eq!(picked.get(), 1);
        assert_eq!(runs.get(), 1);

        use_left.set(false);
        assert_eq!(picked.get(), 11);
        left.set(2);
        assert_eq!(picked.get(), 11);
        assert_eq!(runs.get(), 2);
    }
}
